use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Avaliacao, EvaluationStatus};
use super::repository::{AssignmentChange, EvaluationRepository};
use crate::context::{AccessDenied, RequestContext};
use crate::ids::{AvaliacaoId, EditalId, ProjetoId, UserId};
use crate::store::RepositoryError;
use crate::workflows::edital::EditalRepository;
use crate::workflows::projects::ProjectRepository;

/// One cell of the evaluator × project matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentPair {
    pub avaliador_id: UserId,
    pub projeto_id: ProjetoId,
}

impl From<&Avaliacao> for AssignmentPair {
    fn from(avaliacao: &Avaliacao) -> Self {
        Self {
            avaliador_id: avaliacao.avaliador_id,
            projeto_id: avaliacao.projeto_id,
        }
    }
}

/// Difference between the stored assignments and the desired matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentDiff {
    pub to_add: Vec<AssignmentPair>,
    pub to_remove: Vec<Avaliacao>,
}

impl AssignmentDiff {
    pub fn compute(current: &[Avaliacao], desired: &BTreeSet<AssignmentPair>) -> Self {
        let existing: BTreeMap<AssignmentPair, &Avaliacao> = current
            .iter()
            .map(|avaliacao| (AssignmentPair::from(avaliacao), avaliacao))
            .collect();

        let to_add = desired
            .iter()
            .filter(|pair| !existing.contains_key(pair))
            .copied()
            .collect();

        let to_remove = existing
            .iter()
            .filter(|(pair, _)| !desired.contains(pair))
            .map(|(_, avaliacao)| (*avaliacao).clone())
            .collect();

        Self { to_add, to_remove }
    }

    /// First removal that would discard a finalized evaluation.
    pub fn blocking(&self) -> Option<&Avaliacao> {
        self.to_remove.iter().find(|avaliacao| avaliacao.is_finalized())
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub adicionadas: usize,
    pub removidas: usize,
}

/// Applies a full desired matrix for one edital as a diff against the stored assignments.
pub struct AssignmentMatrix<R> {
    repository: Arc<R>,
}

impl<R> AssignmentMatrix<R>
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn current(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<Avaliacao>, AssignmentError> {
        ctx.require_manager("view evaluator assignments")?;
        self.ensure_edital(ctx, edital_id).await?;
        let snapshot = self
            .repository
            .assignments_for_edital(ctx.tenant_id, edital_id)
            .await?;
        Ok(snapshot.avaliacoes)
    }

    /// Replace the edital's assignments with `desired`. Either every add and remove is applied
    /// or, when a removal targets a finalized evaluation, none is.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
        desired: Vec<AssignmentPair>,
    ) -> Result<AssignmentSummary, AssignmentError> {
        ctx.require_manager("assign evaluators")?;
        self.ensure_edital(ctx, edital_id).await?;

        let known_projects: HashSet<ProjetoId> = self
            .repository
            .projects_for_edital(ctx.tenant_id, edital_id)
            .await?
            .into_iter()
            .map(|projeto| projeto.id)
            .collect();
        if let Some(unknown) = desired
            .iter()
            .find(|pair| !known_projects.contains(&pair.projeto_id))
        {
            return Err(AssignmentError::UnknownProject(unknown.projeto_id));
        }

        let desired: BTreeSet<AssignmentPair> = desired.into_iter().collect();
        let snapshot = self
            .repository
            .assignments_for_edital(ctx.tenant_id, edital_id)
            .await?;
        let diff = AssignmentDiff::compute(&snapshot.avaliacoes, &desired);

        if let Some(blocking) = diff.blocking() {
            return Err(AssignmentError::FinalizedEvaluation {
                avaliacao_id: blocking.id,
                avaliador_id: blocking.avaliador_id,
                projeto_id: blocking.projeto_id,
            });
        }

        let summary = AssignmentSummary {
            adicionadas: diff.to_add.len(),
            removidas: diff.to_remove.len(),
        };
        if diff.is_empty() {
            return Ok(summary);
        }

        let now = Utc::now();
        let change = AssignmentChange {
            tenant_id: ctx.tenant_id,
            edital_id,
            expected_version: snapshot.version,
            insert: diff
                .to_add
                .iter()
                .map(|pair| Avaliacao {
                    id: AvaliacaoId::new(),
                    tenant_id: ctx.tenant_id,
                    edital_id,
                    projeto_id: pair.projeto_id,
                    avaliador_id: pair.avaliador_id,
                    status: EvaluationStatus::EmAndamento,
                    justificativa: None,
                    nota_total: None,
                    criado_em: now,
                    finalizado_em: None,
                })
                .collect(),
            remove: diff.to_remove.iter().map(|avaliacao| avaliacao.id).collect(),
        };

        self.repository
            .apply_assignments(change)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => AssignmentError::Conflict { edital_id },
                other => AssignmentError::Repository(other),
            })?;

        info!(
            edital_id = %edital_id,
            added = summary.adicionadas,
            removed = summary.removidas,
            "evaluator assignments saved"
        );

        Ok(summary)
    }

    async fn ensure_edital(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<(), AssignmentError> {
        self.repository
            .fetch_edital(ctx.tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .map(|_| ())
            .ok_or(AssignmentError::EditalNotFound(edital_id))
    }
}

/// Error raised while saving the assignment matrix.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("edital {0} not found")]
    EditalNotFound(EditalId),
    #[error("project {0} does not belong to this edital")]
    UnknownProject(ProjetoId),
    #[error(
        "evaluation {avaliacao_id} by evaluator {avaliador_id} on project {projeto_id} \
         is finalized and cannot be unassigned"
    )]
    FinalizedEvaluation {
        avaliacao_id: AvaliacaoId,
        avaliador_id: UserId,
        projeto_id: ProjetoId,
    },
    #[error("assignments of edital {edital_id} changed concurrently; reload and retry")]
    Conflict { edital_id: EditalId },
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
