use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use elo_cultura::workflows::accountability::accountability_router;
use elo_cultura::workflows::appeals::appeal_router;
use elo_cultura::workflows::edital::edital_router;
use elo_cultura::workflows::evaluation::evaluation_router;
use elo_cultura::workflows::projects::project_router;
use elo_cultura::workflows::triage::triage_router;
use serde_json::json;
use std::sync::Arc;

/// Every workflow router plus the operational endpoints. Expects an [`AppState`] extension.
pub(crate) fn app(services: &Services) -> Router {
    edital_router(Arc::clone(&services.editais))
        .merge(project_router(Arc::clone(&services.projects)))
        .merge(evaluation_router(services.evaluation.clone()))
        .merge(triage_router(Arc::clone(&services.triage)))
        .merge(appeal_router(Arc::clone(&services.appeals)))
        .merge(accountability_router(Arc::clone(&services.accountability)))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
