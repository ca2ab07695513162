use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use super::assignment::{AssignmentError, AssignmentMatrix, AssignmentPair};
use super::domain::{CriterionScore, NewCriterio};
use super::repository::EvaluationRepository;
use super::service::{EvaluationError, EvaluationService};
use crate::context::RequestContext;
use crate::ids::{AvaliacaoId, EditalId};
use crate::workflows::edital::EditalRepository;
use crate::workflows::http::error_response;
use crate::workflows::projects::ProjectRepository;

pub struct EvaluationState<R> {
    pub matrix: Arc<AssignmentMatrix<R>>,
    pub service: Arc<EvaluationService<R>>,
}

impl<R> Clone for EvaluationState<R> {
    fn clone(&self) -> Self {
        Self {
            matrix: Arc::clone(&self.matrix),
            service: Arc::clone(&self.service),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentRequest {
    pub(crate) atribuicoes: Vec<AssignmentPair>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoresRequest {
    pub(crate) notas: Vec<CriterionScore>,
    #[serde(default)]
    pub(crate) justificativa: Option<String>,
}

/// Router exposing rubric edition, the assignment matrix and evaluator scoring.
pub fn evaluation_router<R>(state: EvaluationState<R>) -> Router
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/editais/:edital_id/criterios",
            get(criteria_handler::<R>).put(replace_criteria_handler::<R>),
        )
        .route(
            "/api/v1/editais/:edital_id/atribuicoes",
            get(assignments_handler::<R>).put(save_assignments_handler::<R>),
        )
        .route("/api/v1/avaliacoes/:avaliacao_id", get(sheet_handler::<R>))
        .route(
            "/api/v1/avaliacoes/:avaliacao_id/notas",
            put(save_scores_handler::<R>),
        )
        .route(
            "/api/v1/avaliacoes/:avaliacao_id/finalizar",
            post(finalize_handler::<R>),
        )
        .with_state(state)
}

pub(crate) async fn criteria_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.service.criteria(&ctx, edital_id).await {
        Ok(criterios) => (StatusCode::OK, axum::Json(criterios)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn replace_criteria_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
    axum::Json(criterios): axum::Json<Vec<NewCriterio>>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.service.replace_criteria(&ctx, edital_id, criterios).await {
        Ok(criterios) => (StatusCode::OK, axum::Json(criterios)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn assignments_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.matrix.current(&ctx, edital_id).await {
        Ok(avaliacoes) => (StatusCode::OK, axum::Json(avaliacoes)).into_response(),
        Err(err) => assignment_error_response(err),
    }
}

pub(crate) async fn save_assignments_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(edital_id): Path<EditalId>,
    axum::Json(request): axum::Json<AssignmentRequest>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.matrix.save(&ctx, edital_id, request.atribuicoes).await {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => assignment_error_response(err),
    }
}

pub(crate) async fn sheet_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(avaliacao_id): Path<AvaliacaoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.service.sheet(&ctx, avaliacao_id).await {
        Ok(sheet) => (StatusCode::OK, axum::Json(sheet)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn save_scores_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(avaliacao_id): Path<AvaliacaoId>,
    axum::Json(request): axum::Json<ScoresRequest>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state
        .service
        .save_scores(&ctx, avaliacao_id, request.notas, request.justificativa)
        .await
    {
        Ok(sheet) => (StatusCode::OK, axum::Json(sheet)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn finalize_handler<R>(
    State(state): State<EvaluationState<R>>,
    ctx: RequestContext,
    Path(avaliacao_id): Path<AvaliacaoId>,
) -> Response
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    match state.service.finalize(&ctx, avaliacao_id).await {
        Ok(avaliacao) => (StatusCode::OK, axum::Json(avaliacao)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

fn assignment_error_response(err: AssignmentError) -> Response {
    let status = match &err {
        AssignmentError::EditalNotFound(_) => StatusCode::NOT_FOUND,
        AssignmentError::UnknownProject(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssignmentError::FinalizedEvaluation { .. } | AssignmentError::Conflict { .. } => {
            StatusCode::CONFLICT
        }
        AssignmentError::Forbidden(_) => StatusCode::FORBIDDEN,
        AssignmentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn evaluation_error_response(err: EvaluationError) -> Response {
    let status = match &err {
        EvaluationError::EditalNotFound(_) | EvaluationError::EvaluationNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EvaluationError::NotAssigned(_) | EvaluationError::Forbidden(_) => StatusCode::FORBIDDEN,
        EvaluationError::AlreadyFinalized(_)
        | EvaluationError::WrongPhase { .. }
        | EvaluationError::CriteriaLocked(_) => StatusCode::CONFLICT,
        EvaluationError::UnknownCriterion(_)
        | EvaluationError::DuplicateCriterion(_)
        | EvaluationError::ScoreOutOfRange { .. }
        | EvaluationError::MissingScores(_)
        | EvaluationError::InvalidCriterion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EvaluationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
