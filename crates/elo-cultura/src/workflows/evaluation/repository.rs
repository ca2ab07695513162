use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{Avaliacao, AvaliacaoCriterio, Criterio};
use crate::ids::{AvaliacaoId, EditalId, TenantId};
use crate::store::RepositoryError;

/// Current assignments of an edital together with the version they were read at.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSnapshot {
    pub version: u64,
    pub avaliacoes: Vec<Avaliacao>,
}

/// All-or-nothing assignment update. Stores must reject the whole change with
/// [`RepositoryError::Conflict`] when the version moved or a removal target is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentChange {
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub expected_version: u64,
    pub insert: Vec<Avaliacao>,
    pub remove: Vec<AvaliacaoId>,
}

/// Storage abstraction for criteria, assignments and evaluator scores.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    /// Criteria ordered by `ordem`.
    async fn criteria_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Criterio>, RepositoryError>;

    async fn replace_criteria(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
        criterios: Vec<Criterio>,
    ) -> Result<(), RepositoryError>;

    async fn assignments_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<AssignmentSnapshot, RepositoryError>;

    async fn apply_assignments(&self, change: AssignmentChange) -> Result<(), RepositoryError>;

    async fn fetch_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Option<Avaliacao>, RepositoryError>;

    async fn scores_for_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Vec<AvaliacaoCriterio>, RepositoryError>;

    /// Replace every score row of the evaluation. Rejected once it is finalized.
    async fn replace_scores(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
        justificativa: Option<String>,
        scores: Vec<AvaliacaoCriterio>,
    ) -> Result<(), RepositoryError>;

    /// Rejected with [`RepositoryError::Conflict`] when already finalized.
    async fn finalize_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
        nota_total: f64,
        at: DateTime<Utc>,
    ) -> Result<Avaliacao, RepositoryError>;

    /// Whether any evaluation of the edital has saved scores.
    async fn edital_has_scores(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<bool, RepositoryError>;
}
