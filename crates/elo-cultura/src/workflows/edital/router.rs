use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use super::domain::NewEdital;
use super::repository::EditalRepository;
use super::state_machine::{EditalError, EditalStateMachine};
use crate::context::RequestContext;
use crate::ids::EditalId;
use crate::notifications::DirectoryRepository;
use crate::workflows::http::error_response;

/// Router exposing edital creation, phase advancement and progress inspection.
pub fn edital_router<R>(machine: Arc<EditalStateMachine<R>>) -> Router
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/editais", post(create_handler::<R>))
        .route("/api/v1/editais/:edital_id", get(get_handler::<R>))
        .route(
            "/api/v1/editais/:edital_id/avancar",
            post(advance_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/completude",
            get(completeness_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/fases",
            get(history_handler::<R>),
        )
        .with_state(machine)
}

pub(crate) async fn create_handler<R>(
    State(machine): State<Arc<EditalStateMachine<R>>>,
    ctx: RequestContext,
    axum::Json(draft): axum::Json<NewEdital>,
) -> Response
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    match machine.create(&ctx, draft).await {
        Ok(edital) => (StatusCode::CREATED, axum::Json(edital)).into_response(),
        Err(err) => edital_error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(machine): State<Arc<EditalStateMachine<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    match machine.get(&ctx, edital_id).await {
        Ok(edital) => (StatusCode::OK, axum::Json(edital)).into_response(),
        Err(err) => edital_error_response(err),
    }
}

pub(crate) async fn advance_handler<R>(
    State(machine): State<Arc<EditalStateMachine<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    match machine.advance(&ctx, edital_id).await {
        Ok(advance) => (StatusCode::OK, axum::Json(advance)).into_response(),
        Err(err) => edital_error_response(err),
    }
}

pub(crate) async fn completeness_handler<R>(
    State(machine): State<Arc<EditalStateMachine<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    match machine.completeness(&ctx, edital_id).await {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => edital_error_response(err),
    }
}

pub(crate) async fn history_handler<R>(
    State(machine): State<Arc<EditalStateMachine<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    match machine.history(&ctx, edital_id).await {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => edital_error_response(err),
    }
}

fn edital_error_response(err: EditalError) -> Response {
    let status = match &err {
        EditalError::NotFound(_) => StatusCode::NOT_FOUND,
        EditalError::TerminalState { .. } | EditalError::Conflict { .. } => StatusCode::CONFLICT,
        EditalError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EditalError::Forbidden(_) => StatusCode::FORBIDDEN,
        EditalError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
