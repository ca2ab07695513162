use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::orchestrator::{TriageError, TriageOrchestrator};
use super::repository::TriageRepository;
use crate::context::RequestContext;
use crate::ids::{EditalId, ExecucaoId};
use crate::workflows::edital::EditalRepository;
use crate::workflows::evaluation::EvaluationRepository;
use crate::workflows::http::error_response;
use crate::workflows::projects::ProjectRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct TriageRequest {
    pub(crate) edital_id: EditalId,
}

/// Router exposing triage runs. Runs are started in the background and observed by polling.
pub fn triage_router<R>(orchestrator: Arc<TriageOrchestrator<R>>) -> Router
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    Router::new()
        .route("/api/v1/triagem", post(start_handler::<R>))
        .route("/api/v1/triagem/reconciliar", post(reconcile_handler::<R>))
        .route("/api/v1/triagem/:execucao_id", get(status_handler::<R>))
        .route(
            "/api/v1/triagem/:execucao_id/resultados",
            get(results_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/triagem",
            get(latest_handler::<R>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn start_handler<R>(
    State(orchestrator): State<Arc<TriageOrchestrator<R>>>,
    ctx: RequestContext,
    axum::Json(request): axum::Json<TriageRequest>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    match orchestrator.begin(&ctx, request.edital_id).await {
        Ok(execucao) => {
            let execucao_id = execucao.id;
            orchestrator.spawn_run(ctx, execucao);
            let payload = json!({ "execucao_id": execucao_id });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => triage_error_response(err),
    }
}

pub(crate) async fn status_handler<R>(
    State(orchestrator): State<Arc<TriageOrchestrator<R>>>,
    ctx: RequestContext,
    Path(execucao_id): Path<ExecucaoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    match orchestrator.status(&ctx, execucao_id).await {
        Ok(execucao) => (StatusCode::OK, axum::Json(execucao)).into_response(),
        Err(err) => triage_error_response(err),
    }
}

pub(crate) async fn results_handler<R>(
    State(orchestrator): State<Arc<TriageOrchestrator<R>>>,
    ctx: RequestContext,
    Path(execucao_id): Path<ExecucaoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    match orchestrator.results(&ctx, execucao_id).await {
        Ok(resultados) => (StatusCode::OK, axum::Json(resultados)).into_response(),
        Err(err) => triage_error_response(err),
    }
}

pub(crate) async fn latest_handler<R>(
    State(orchestrator): State<Arc<TriageOrchestrator<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    match orchestrator.latest_results(&ctx, edital_id).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => triage_error_response(err),
    }
}

pub(crate) async fn reconcile_handler<R>(
    State(orchestrator): State<Arc<TriageOrchestrator<R>>>,
    ctx: RequestContext,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    match orchestrator.reconcile(&ctx).await {
        Ok(execucoes) => {
            let payload = json!({ "reconciliadas": execucoes });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => triage_error_response(err),
    }
}

fn triage_error_response(err: TriageError) -> Response {
    let status = match &err {
        TriageError::EditalNotFound(_)
        | TriageError::ExecutionNotFound(_)
        | TriageError::NoConcludedRun(_) => StatusCode::NOT_FOUND,
        TriageError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        TriageError::Forbidden(_) => StatusCode::FORBIDDEN,
        TriageError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
