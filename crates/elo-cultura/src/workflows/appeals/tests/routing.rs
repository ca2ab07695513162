use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::test_support::{read_json_body, request, Fixture};
use crate::workflows::appeals::{appeal_router, AppealService};
use crate::workflows::edital::Phase;

#[tokio::test]
async fn appeal_lifecycle_over_http() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::RecursoAvaliacao, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let app = appeal_router(Arc::new(AppealService::new(
        fixture.store.clone(),
        fixture.notifier.clone(),
    )));

    let filed = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/recursos",
            Some(&maria),
            Some(json!({
                "projeto_id": projeto.id,
                "tipo": "avaliacao",
                "fundamentacao": "O critério 2 foi avaliado sem considerar o portfólio."
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(filed.status(), StatusCode::CREATED);
    let recurso_id = read_json_body(filed).await["id"]
        .as_str()
        .expect("appeal id")
        .to_string();

    let duplicate = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/recursos",
            Some(&maria),
            Some(json!({
                "projeto_id": projeto.id,
                "tipo": "avaliacao",
                "fundamentacao": "Reitero o pedido."
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let analysed = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/recursos/{recurso_id}/analise"),
            Some(&fixture.gestor),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(analysed.status(), StatusCode::OK);

    let decided = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/recursos/{recurso_id}/decisao"),
            Some(&fixture.gestor),
            Some(json!({ "decisao": "indeferido", "resposta": "Nota mantida." })),
        ))
        .await
        .expect("router responds");
    assert_eq!(decided.status(), StatusCode::OK);
    assert_eq!(read_json_body(decided).await["status"], "indeferido");
    fixture.notifier.drain().await;

    let listed = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/editais/{}/recursos", edital.id),
            Some(&maria),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(read_json_body(listed).await.as_array().map(Vec::len), Some(1));
}
