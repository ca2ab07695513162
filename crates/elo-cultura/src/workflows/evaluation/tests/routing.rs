use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::{evaluation_of, evaluator, matrix, pair, router, service, scores};
use crate::test_support::{read_json_body, request, Fixture};
use crate::workflows::edital::Phase;

#[tokio::test]
async fn assignment_matrix_round_trips_through_http() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let avaliador = evaluator(&fixture);
    let app = router(&fixture);

    let saved = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/editais/{}/atribuicoes", edital.id),
            Some(&fixture.gestor),
            Some(json!({
                "atribuicoes": [
                    { "avaliador_id": avaliador.actor_id, "projeto_id": projeto.id }
                ]
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(saved.status(), StatusCode::OK);
    let body = read_json_body(saved).await;
    assert_eq!(body["adicionadas"], 1);
    assert_eq!(body["removidas"], 0);

    let listed = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/editais/{}/atribuicoes", edital.id),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");
    let body = read_json_body(listed).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["status"], "em_andamento");
}

#[tokio::test]
async fn removing_a_finalized_assignment_conflicts() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let criterios = fixture.criteria(&edital, &[1.0]).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let avaliador = evaluator(&fixture);
    matrix(&fixture)
        .save(&fixture.gestor, edital.id, vec![pair(&avaliador, projeto.id)])
        .await
        .expect("assigned");
    let avaliacao = evaluation_of(&fixture, edital.id, &avaliador).await;
    let service = service(&fixture);
    service
        .save_scores(&avaliador, avaliacao.id, scores(&criterios, &[6.0]), None)
        .await
        .expect("scored");
    service.finalize(&avaliador, avaliacao.id).await.expect("finalized");

    let response = router(&fixture)
        .oneshot(request(
            "PUT",
            &format!("/api/v1/editais/{}/atribuicoes", edital.id),
            Some(&fixture.gestor),
            Some(json!({ "atribuicoes": [] })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("cannot be unassigned"));
}

#[tokio::test]
async fn evaluator_scores_and_finalizes_over_http() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let criterios = fixture.criteria(&edital, &[2.0, 1.0, 1.0]).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let avaliador = evaluator(&fixture);
    matrix(&fixture)
        .save(&fixture.gestor, edital.id, vec![pair(&avaliador, projeto.id)])
        .await
        .expect("assigned");
    let avaliacao = evaluation_of(&fixture, edital.id, &avaliador).await;
    let app = router(&fixture);

    let notas: Vec<_> = criterios
        .iter()
        .zip([8.0, 6.0, 10.0])
        .map(|(criterio, nota)| json!({ "criterio_id": criterio.id, "nota": nota }))
        .collect();
    let saved = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/avaliacoes/{}/notas", avaliacao.id),
            Some(&avaliador),
            Some(json!({ "notas": notas })),
        ))
        .await
        .expect("router responds");
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(read_json_body(saved).await["nota_parcial"], 8.0);

    let finalized = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/avaliacoes/{}/finalizar", avaliacao.id),
            Some(&avaliador),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(finalized.status(), StatusCode::OK);
    let body = read_json_body(finalized).await;
    assert_eq!(body["status"], "finalizada");
    assert_eq!(body["nota_total"], 8.0);
}

#[tokio::test]
async fn out_of_range_scores_are_unprocessable() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let criterios = fixture.criteria(&edital, &[1.0]).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let avaliador = evaluator(&fixture);
    matrix(&fixture)
        .save(&fixture.gestor, edital.id, vec![pair(&avaliador, projeto.id)])
        .await
        .expect("assigned");
    let avaliacao = evaluation_of(&fixture, edital.id, &avaliador).await;

    let response = router(&fixture)
        .oneshot(request(
            "PUT",
            &format!("/api/v1/avaliacoes/{}/notas", avaliacao.id),
            Some(&avaliador),
            Some(json!({ "notas": [{ "criterio_id": criterios[0].id, "nota": 11 }] })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn repeated_criteria_are_unprocessable() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let criterios = fixture.criteria(&edital, &[1.0]).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let avaliador = evaluator(&fixture);
    matrix(&fixture)
        .save(&fixture.gestor, edital.id, vec![pair(&avaliador, projeto.id)])
        .await
        .expect("assigned");
    let avaliacao = evaluation_of(&fixture, edital.id, &avaliador).await;

    let response = router(&fixture)
        .oneshot(request(
            "PUT",
            &format!("/api/v1/avaliacoes/{}/notas", avaliacao.id),
            Some(&avaliador),
            Some(json!({ "notas": [
                { "criterio_id": criterios[0].id, "nota": 2 },
                { "criterio_id": criterios[0].id, "nota": 9 }
            ] })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("scored more than once")));
}

#[tokio::test]
async fn criteria_listing_requires_identity() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;

    let response = router(&fixture)
        .oneshot(request(
            "GET",
            &format!("/api/v1/editais/{}/criterios", edital.id),
            None,
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
