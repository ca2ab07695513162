use async_trait::async_trait;

use super::domain::{Edital, EditalFase, PhaseCompleteness, PhaseTransition};
use crate::ids::{EditalId, TenantId};
use crate::store::RepositoryError;

/// Storage abstraction for editais and their phase history.
#[async_trait]
pub trait EditalRepository: Send + Sync {
    /// Persist a new edital and open the history row of its initial phase.
    async fn insert_edital(&self, edital: Edital) -> Result<Edital, RepositoryError>;

    async fn fetch_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Option<Edital>, RepositoryError>;

    /// Apply a status change in one unit: verify `expected_version`, close the open history row,
    /// open the next one and bump the version. A stale version yields
    /// [`RepositoryError::Conflict`].
    async fn transition_phase(&self, transition: PhaseTransition)
        -> Result<Edital, RepositoryError>;

    async fn phase_history(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<EditalFase>, RepositoryError>;

    async fn completeness(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<PhaseCompleteness, RepositoryError>;
}
