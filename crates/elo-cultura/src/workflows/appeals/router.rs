use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{AppealDecision, NewRecurso};
use super::repository::AppealRepository;
use super::service::{AppealError, AppealService};
use crate::context::RequestContext;
use crate::ids::{EditalId, RecursoId};
use crate::notifications::DirectoryRepository;
use crate::workflows::edital::EditalRepository;
use crate::workflows::http::error_response;
use crate::workflows::projects::ProjectRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) decisao: AppealDecision,
    pub(crate) resposta: String,
}

pub fn appeal_router<R>(service: Arc<AppealService<R>>) -> Router
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/recursos", post(file_handler::<R>))
        .route("/api/v1/recursos/:recurso_id", get(get_handler::<R>))
        .route(
            "/api/v1/recursos/:recurso_id/analise",
            post(start_analysis_handler::<R>),
        )
        .route(
            "/api/v1/recursos/:recurso_id/decisao",
            post(decide_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/recursos",
            get(list_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn file_handler<R>(
    State(service): State<Arc<AppealService<R>>>,
    ctx: RequestContext,
    axum::Json(draft): axum::Json<NewRecurso>,
) -> Response
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    match service.file(&ctx, draft).await {
        Ok(recurso) => (StatusCode::CREATED, axum::Json(recurso)).into_response(),
        Err(err) => appeal_error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<AppealService<R>>>,
    ctx: RequestContext,
    Path(recurso_id): Path<RecursoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    match service.get(&ctx, recurso_id).await {
        Ok(recurso) => (StatusCode::OK, axum::Json(recurso)).into_response(),
        Err(err) => appeal_error_response(err),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<AppealService<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    match service.list(&ctx, edital_id).await {
        Ok(recursos) => (StatusCode::OK, axum::Json(recursos)).into_response(),
        Err(err) => appeal_error_response(err),
    }
}

pub(crate) async fn start_analysis_handler<R>(
    State(service): State<Arc<AppealService<R>>>,
    ctx: RequestContext,
    Path(recurso_id): Path<RecursoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    match service.start_analysis(&ctx, recurso_id).await {
        Ok(recurso) => (StatusCode::OK, axum::Json(recurso)).into_response(),
        Err(err) => appeal_error_response(err),
    }
}

pub(crate) async fn decide_handler<R>(
    State(service): State<Arc<AppealService<R>>>,
    ctx: RequestContext,
    Path(recurso_id): Path<RecursoId>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    match service
        .decide(&ctx, recurso_id, request.decisao, request.resposta)
        .await
    {
        Ok(recurso) => (StatusCode::OK, axum::Json(recurso)).into_response(),
        Err(err) => appeal_error_response(err),
    }
}

fn appeal_error_response(err: AppealError) -> Response {
    let status = match &err {
        AppealError::EditalNotFound(_)
        | AppealError::ProjectNotFound(_)
        | AppealError::RecursoNotFound(_) => StatusCode::NOT_FOUND,
        AppealError::WrongPhase { .. }
        | AppealError::WindowClosed { .. }
        | AppealError::AlreadyOpen { .. }
        | AppealError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AppealError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppealError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppealError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
