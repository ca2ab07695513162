use async_trait::async_trait;

use super::domain::{Recurso, RecursoStatus};
use crate::ids::{EditalId, RecursoId, TenantId};
use crate::store::RepositoryError;

/// Storage abstraction for appeals.
#[async_trait]
pub trait AppealRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the project already has an open appeal of
    /// the same kind.
    async fn insert_recurso(&self, recurso: Recurso) -> Result<Recurso, RepositoryError>;

    async fn fetch_recurso(
        &self,
        tenant_id: TenantId,
        recurso_id: RecursoId,
    ) -> Result<Option<Recurso>, RepositoryError>;

    /// Compare-and-set on the stored status.
    async fn update_recurso(
        &self,
        recurso: Recurso,
        expected: RecursoStatus,
    ) -> Result<Recurso, RepositoryError>;

    async fn recursos_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Recurso>, RepositoryError>;
}
