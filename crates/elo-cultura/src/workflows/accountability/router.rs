use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{AccountabilityDraft, ReviewDecision};
use super::repository::AccountabilityRepository;
use super::service::{AccountabilityError, AccountabilityService};
use crate::context::RequestContext;
use crate::ids::{EditalId, PrestacaoId, ProjetoId};
use crate::notifications::DirectoryRepository;
use crate::workflows::http::error_response;
use crate::workflows::projects::ProjectRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decisao: ReviewDecision,
    #[serde(default)]
    pub(crate) parecer: Option<String>,
}

pub fn accountability_router<R>(service: Arc<AccountabilityService<R>>) -> Router
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/projetos/:projeto_id/prestacao-contas",
            post(create_handler::<R>),
        )
        .route(
            "/api/v1/prestacoes-contas/:prestacao_id",
            get(get_handler::<R>).put(update_handler::<R>),
        )
        .route(
            "/api/v1/prestacoes-contas/:prestacao_id/enviar",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/prestacoes-contas/:prestacao_id/analise",
            post(start_review_handler::<R>),
        )
        .route(
            "/api/v1/prestacoes-contas/:prestacao_id/decisao",
            post(decide_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/prestacoes-contas",
            get(list_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(projeto_id): Path<ProjetoId>,
    axum::Json(draft): axum::Json<AccountabilityDraft>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.create(&ctx, projeto_id, draft).await {
        Ok(prestacao) => (StatusCode::CREATED, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(prestacao_id): Path<PrestacaoId>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.get(&ctx, prestacao_id).await {
        Ok(prestacao) => (StatusCode::OK, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(prestacao_id): Path<PrestacaoId>,
    axum::Json(draft): axum::Json<AccountabilityDraft>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.update(&ctx, prestacao_id, draft).await {
        Ok(prestacao) => (StatusCode::OK, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(prestacao_id): Path<PrestacaoId>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.submit(&ctx, prestacao_id).await {
        Ok(prestacao) => (StatusCode::OK, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn start_review_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(prestacao_id): Path<PrestacaoId>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.start_review(&ctx, prestacao_id).await {
        Ok(prestacao) => (StatusCode::OK, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn decide_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(prestacao_id): Path<PrestacaoId>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service
        .decide(&ctx, prestacao_id, request.decisao, request.parecer)
        .await
    {
        Ok(prestacao) => (StatusCode::OK, axum::Json(prestacao)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<AccountabilityService<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    match service.list(&ctx, edital_id).await {
        Ok(prestacoes) => (StatusCode::OK, axum::Json(prestacoes)).into_response(),
        Err(err) => accountability_error_response(err),
    }
}

fn accountability_error_response(err: AccountabilityError) -> Response {
    let status = match &err {
        AccountabilityError::NotFound(_) | AccountabilityError::ProjectNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        AccountabilityError::NotSelected(_)
        | AccountabilityError::AlreadyExists(_)
        | AccountabilityError::NotEditable { .. }
        | AccountabilityError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AccountabilityError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AccountabilityError::Forbidden(_) => StatusCode::FORBIDDEN,
        AccountabilityError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
