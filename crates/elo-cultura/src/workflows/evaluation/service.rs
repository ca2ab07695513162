use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::aggregator::{weighted_average, WeightedScore};
use super::domain::{Avaliacao, AvaliacaoCriterio, Criterio, CriterionScore, NewCriterio};
use super::repository::EvaluationRepository;
use crate::context::{AccessDenied, RequestContext, Role};
use crate::ids::{AvaliacaoId, CriterioId, EditalId};
use crate::store::RepositoryError;
use crate::workflows::edital::{Edital, EditalRepository, Phase};

/// Evaluator scoring and rubric maintenance.
pub struct EvaluationService<R> {
    repository: Arc<R>,
}

/// An evaluation with its saved criterion scores.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EvaluationSheet {
    pub avaliacao: Avaliacao,
    pub notas: Vec<AvaliacaoCriterio>,
    pub nota_parcial: f64,
}

impl<R> EvaluationService<R>
where
    R: EditalRepository + EvaluationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn criteria(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<Criterio>, EvaluationError> {
        self.load_edital(ctx, edital_id).await?;
        Ok(self
            .repository
            .criteria_for_edital(ctx.tenant_id, edital_id)
            .await?)
    }

    /// Bulk replace of the rubric. Refused once any evaluator saved a score, since stored
    /// scores reference the current criteria.
    pub async fn replace_criteria(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
        criterios: Vec<NewCriterio>,
    ) -> Result<Vec<Criterio>, EvaluationError> {
        ctx.require_manager("edit evaluation criteria")?;
        self.load_edital(ctx, edital_id).await?;

        for (index, criterio) in criterios.iter().enumerate() {
            validate_criterion(index, criterio)?;
        }

        if self
            .repository
            .edital_has_scores(ctx.tenant_id, edital_id)
            .await?
        {
            return Err(EvaluationError::CriteriaLocked(edital_id));
        }

        let criterios: Vec<Criterio> = criterios
            .into_iter()
            .map(|draft| Criterio {
                id: CriterioId::new(),
                tenant_id: ctx.tenant_id,
                edital_id,
                descricao: draft.descricao.trim().to_string(),
                nota_minima: draft.nota_minima,
                nota_maxima: draft.nota_maxima,
                peso: draft.peso,
                ordem: draft.ordem,
            })
            .collect();

        self.repository
            .replace_criteria(ctx.tenant_id, edital_id, criterios)
            .await?;
        Ok(self
            .repository
            .criteria_for_edital(ctx.tenant_id, edital_id)
            .await?)
    }

    pub async fn sheet(
        &self,
        ctx: &RequestContext,
        avaliacao_id: AvaliacaoId,
    ) -> Result<EvaluationSheet, EvaluationError> {
        let avaliacao = self.load_evaluation(ctx, avaliacao_id).await?;
        if !ctx.role.is_manager() && avaliacao.avaliador_id != ctx.actor_id {
            return Err(EvaluationError::NotAssigned(avaliacao_id));
        }
        let criterios = self
            .repository
            .criteria_for_edital(ctx.tenant_id, avaliacao.edital_id)
            .await?;
        let notas = self
            .repository
            .scores_for_evaluation(ctx.tenant_id, avaliacao_id)
            .await?;
        let nota_parcial = aggregate(&criterios, &notas);
        Ok(EvaluationSheet {
            avaliacao,
            notas,
            nota_parcial,
        })
    }

    /// Replace the evaluator's criterion scores while the evaluation is still open.
    pub async fn save_scores(
        &self,
        ctx: &RequestContext,
        avaliacao_id: AvaliacaoId,
        scores: Vec<CriterionScore>,
        justificativa: Option<String>,
    ) -> Result<EvaluationSheet, EvaluationError> {
        let (avaliacao, criterios) = self.open_for_scoring(ctx, avaliacao_id).await?;
        let by_id: HashMap<CriterioId, &Criterio> =
            criterios.iter().map(|criterio| (criterio.id, criterio)).collect();

        let mut seen = HashSet::with_capacity(scores.len());
        let mut rows = Vec::with_capacity(scores.len());
        for score in scores {
            let criterio = by_id
                .get(&score.criterio_id)
                .ok_or(EvaluationError::UnknownCriterion(score.criterio_id))?;
            if !seen.insert(criterio.id) {
                return Err(EvaluationError::DuplicateCriterion(criterio.id));
            }
            let Some(nota) = score.nota else {
                continue;
            };
            if !criterio.accepts(nota) {
                return Err(EvaluationError::ScoreOutOfRange {
                    criterio_id: criterio.id,
                    nota,
                    minima: criterio.nota_minima,
                    maxima: criterio.nota_maxima,
                });
            }
            rows.push(AvaliacaoCriterio {
                avaliacao_id,
                criterio_id: criterio.id,
                nota,
                comentario: score.comentario,
            });
        }

        self.repository
            .replace_scores(ctx.tenant_id, avaliacao.id, justificativa, rows)
            .await
            .map_err(|err| finalized_on_conflict(err, avaliacao_id))?;

        self.sheet(ctx, avaliacao_id).await
    }

    /// Freeze the evaluation with its weighted total. Every criterion must be scored.
    pub async fn finalize(
        &self,
        ctx: &RequestContext,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Avaliacao, EvaluationError> {
        let (avaliacao, criterios) = self.open_for_scoring(ctx, avaliacao_id).await?;
        let notas = self
            .repository
            .scores_for_evaluation(ctx.tenant_id, avaliacao.id)
            .await?;

        let missing: Vec<CriterioId> = criterios
            .iter()
            .filter(|criterio| !notas.iter().any(|nota| nota.criterio_id == criterio.id))
            .map(|criterio| criterio.id)
            .collect();
        if !missing.is_empty() {
            return Err(EvaluationError::MissingScores(missing));
        }

        let nota_total = aggregate(&criterios, &notas);
        let finalized = self
            .repository
            .finalize_evaluation(ctx.tenant_id, avaliacao.id, nota_total, Utc::now())
            .await
            .map_err(|err| finalized_on_conflict(err, avaliacao_id))?;

        info!(
            avaliacao_id = %avaliacao_id,
            projeto_id = %finalized.projeto_id,
            nota_total,
            "evaluation finalized"
        );
        Ok(finalized)
    }

    async fn open_for_scoring(
        &self,
        ctx: &RequestContext,
        avaliacao_id: AvaliacaoId,
    ) -> Result<(Avaliacao, Vec<Criterio>), EvaluationError> {
        ctx.require_role(Role::Avaliador, "score evaluations")?;
        let avaliacao = self.load_evaluation(ctx, avaliacao_id).await?;
        if avaliacao.avaliador_id != ctx.actor_id {
            return Err(EvaluationError::NotAssigned(avaliacao_id));
        }
        if avaliacao.is_finalized() {
            return Err(EvaluationError::AlreadyFinalized(avaliacao_id));
        }

        let edital = self.load_edital(ctx, avaliacao.edital_id).await?;
        if !edital.status.accepts_evaluations() {
            return Err(EvaluationError::WrongPhase { fase: edital.status });
        }

        let criterios = self
            .repository
            .criteria_for_edital(ctx.tenant_id, avaliacao.edital_id)
            .await?;
        Ok((avaliacao, criterios))
    }

    async fn load_evaluation(
        &self,
        ctx: &RequestContext,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Avaliacao, EvaluationError> {
        self.repository
            .fetch_evaluation(ctx.tenant_id, avaliacao_id)
            .await?
            .ok_or(EvaluationError::EvaluationNotFound(avaliacao_id))
    }

    async fn load_edital(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Edital, EvaluationError> {
        self.repository
            .fetch_edital(ctx.tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .ok_or(EvaluationError::EditalNotFound(edital_id))
    }
}

fn aggregate(criterios: &[Criterio], notas: &[AvaliacaoCriterio]) -> f64 {
    weighted_average(criterios.iter().map(|criterio| WeightedScore {
        nota: notas
            .iter()
            .find(|nota| nota.criterio_id == criterio.id)
            .map(|nota| nota.nota),
        peso: criterio.peso,
    }))
}

fn validate_criterion(index: usize, criterio: &NewCriterio) -> Result<(), EvaluationError> {
    let problem = if criterio.descricao.trim().is_empty() {
        Some("descricao is required")
    } else if !criterio.nota_minima.is_finite() || !criterio.nota_maxima.is_finite() {
        Some("score bounds must be finite")
    } else if criterio.nota_minima >= criterio.nota_maxima {
        Some("nota_minima must be lower than nota_maxima")
    } else if !criterio.peso.is_finite() || criterio.peso < 0.0 {
        Some("peso must be a non-negative number")
    } else {
        None
    };

    match problem {
        Some(reason) => Err(EvaluationError::InvalidCriterion { index, reason }),
        None => Ok(()),
    }
}

fn finalized_on_conflict(err: RepositoryError, avaliacao_id: AvaliacaoId) -> EvaluationError {
    match err {
        RepositoryError::Conflict => EvaluationError::AlreadyFinalized(avaliacao_id),
        other => EvaluationError::Repository(other),
    }
}

/// Error raised by evaluator scoring and rubric maintenance.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("edital {0} not found")]
    EditalNotFound(EditalId),
    #[error("evaluation {0} not found")]
    EvaluationNotFound(AvaliacaoId),
    #[error("evaluation {0} is not assigned to the current user")]
    NotAssigned(AvaliacaoId),
    #[error("evaluation {0} is finalized and can no longer change")]
    AlreadyFinalized(AvaliacaoId),
    #[error("evaluations are not accepted while the edital is in phase {fase}")]
    WrongPhase { fase: Phase },
    #[error("criterion {0} does not belong to this edital")]
    UnknownCriterion(CriterioId),
    #[error("criterion {0} is scored more than once")]
    DuplicateCriterion(CriterioId),
    #[error("score {nota} for criterion {criterio_id} is outside [{minima}, {maxima}]")]
    ScoreOutOfRange {
        criterio_id: CriterioId,
        nota: f64,
        minima: f64,
        maxima: f64,
    },
    #[error("criteria without a score: {0:?}")]
    MissingScores(Vec<CriterioId>),
    #[error("criterion #{index} is invalid: {reason}")]
    InvalidCriterion { index: usize, reason: &'static str },
    #[error("criteria of edital {0} are locked because evaluations already hold scores")]
    CriteriaLocked(EditalId),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
