use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::router;
use crate::context::Role;
use crate::test_support::{read_json_body, request, Fixture};
use crate::workflows::edital::Phase;

#[tokio::test]
async fn create_returns_created_edital_at_criacao() {
    let fixture = Fixture::new();

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            "/api/v1/editais",
            Some(&fixture.gestor),
            Some(json!({
                "numero": "012/2025",
                "titulo": "Edital de Audiovisual",
                "vagas": 3
            })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "criacao");
    assert_eq!(body["vagas"], 3);
}

#[tokio::test]
async fn advance_returns_the_new_phase_and_previous_completeness() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Criacao, 1).await;

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            &format!("/api/v1/editais/{}/avancar", edital.id),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["fase_anterior"], "criacao");
    assert_eq!(body["fase"], "publicacao");
    assert_eq!(body["completude_anterior"]["total_projetos"], 0);
}

#[tokio::test]
async fn advance_without_identity_headers_is_unauthorized() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Criacao, 1).await;

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            &format!("/api/v1/editais/{}/avancar", edital.id),
            None,
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn advance_by_proponent_is_forbidden() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Criacao, 1).await;
    let proponente = fixture.actor(Role::Proponente);

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            &format!("/api/v1/editais/{}/avancar", edital.id),
            Some(&proponente),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn advance_of_unknown_edital_is_not_found() {
    let fixture = Fixture::new();

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            &format!("/api/v1/editais/{}/avancar", crate::ids::EditalId::new()),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap_or_default().contains("not found"));
}

#[tokio::test]
async fn advance_past_arquivamento_conflicts() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Arquivamento, 1).await;

    let response = router(&fixture)
        .oneshot(request(
            "POST",
            &format!("/api/v1/editais/{}/avancar", edital.id),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn completeness_and_history_are_exposed_to_managers() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Inscricao, 1).await;
    let maria = fixture.proponent("maria@example.org");
    fixture
        .project(&edital, &maria, "Ciranda", "Roda de ciranda", 5_000.0)
        .await;
    let app = router(&fixture);

    let completeness = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/editais/{}/completude", edital.id),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(completeness.status(), StatusCode::OK);
    let body = read_json_body(completeness).await;
    assert_eq!(body["total_projetos"], 1);
    assert_eq!(body["habilitacao_pendente"], 1);

    let history = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/editais/{}/fases", edital.id),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(history.status(), StatusCode::OK);
    let body = read_json_body(history).await;
    let rows = body.as_array().expect("history is an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["fase"], "inscricao");
}
