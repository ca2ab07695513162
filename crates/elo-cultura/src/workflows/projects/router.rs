use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{HabilitationDecision, NewDocument, ProjectDraft};
use super::repository::ProjectRepository;
use super::service::{ProjectError, ProjectService};
use crate::context::RequestContext;
use crate::ids::{EditalId, ProjetoId};
use crate::notifications::DirectoryRepository;
use crate::workflows::edital::EditalRepository;
use crate::workflows::evaluation::EvaluationRepository;
use crate::workflows::http::error_response;

#[derive(Debug, Deserialize)]
pub(crate) struct HabilitationRequest {
    pub(crate) decisao: HabilitationDecision,
    #[serde(default)]
    pub(crate) motivo: Option<String>,
}

/// Router exposing project submission, attachments, habilitation and the ranking.
pub fn project_router<R>(service: Arc<ProjectService<R>>) -> Router
where
    R: EditalRepository
        + ProjectRepository
        + EvaluationRepository
        + DirectoryRepository
        + 'static,
{
    Router::new()
        .route(
            "/api/v1/editais/:edital_id/projetos",
            get(list_handler::<R>).post(submit_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/ranking",
            post(ranking_handler::<R>),
        )
        .route("/api/v1/projetos/:projeto_id", get(get_handler::<R>))
        .route(
            "/api/v1/projetos/:projeto_id/documentos",
            get(documents_handler::<R>).post(attach_handler::<R>),
        )
        .route(
            "/api/v1/projetos/:projeto_id/habilitacao",
            post(habilitation_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
    axum::Json(draft): axum::Json<ProjectDraft>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.submit(&ctx, edital_id, draft).await {
        Ok(projeto) => (StatusCode::CREATED, axum::Json(projeto)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.list(&ctx, edital_id).await {
        Ok(projetos) => (StatusCode::OK, axum::Json(projetos)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn ranking_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.compute_ranking(&ctx, edital_id).await {
        Ok(ranking) => (StatusCode::OK, axum::Json(ranking)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(projeto_id): Path<ProjetoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.get(&ctx, projeto_id).await {
        Ok(projeto) => (StatusCode::OK, axum::Json(projeto)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn documents_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(projeto_id): Path<ProjetoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.documents(&ctx, projeto_id).await {
        Ok(documentos) => (StatusCode::OK, axum::Json(documentos)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn attach_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(projeto_id): Path<ProjetoId>,
    axum::Json(document): axum::Json<NewDocument>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service.attach_document(&ctx, projeto_id, document).await {
        Ok(documento) => (StatusCode::CREATED, axum::Json(documento)).into_response(),
        Err(err) => project_error_response(err),
    }
}

pub(crate) async fn habilitation_handler<R>(
    State(service): State<Arc<ProjectService<R>>>,
    ctx: RequestContext,
    Path(projeto_id): Path<ProjetoId>,
    axum::Json(request): axum::Json<HabilitationRequest>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    match service
        .decide_habilitation(&ctx, projeto_id, request.decisao, request.motivo)
        .await
    {
        Ok(projeto) => (StatusCode::OK, axum::Json(projeto)).into_response(),
        Err(err) => project_error_response(err),
    }
}

fn project_error_response(err: ProjectError) -> Response {
    let status = match &err {
        ProjectError::EditalNotFound(_) | ProjectError::ProjectNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ProjectError::WrongPhase { .. } | ProjectError::WindowClosed { .. } => {
            StatusCode::CONFLICT
        }
        ProjectError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProjectError::Forbidden(_) => StatusCode::FORBIDDEN,
        ProjectError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
