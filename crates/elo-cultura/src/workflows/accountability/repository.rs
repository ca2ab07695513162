use async_trait::async_trait;

use super::domain::{PrestacaoContas, PrestacaoStatus};
use crate::ids::{EditalId, PrestacaoId, TenantId};
use crate::store::RepositoryError;

/// Storage abstraction for accountability reports.
#[async_trait]
pub trait AccountabilityRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the project already has a report.
    async fn insert_prestacao(
        &self,
        prestacao: PrestacaoContas,
    ) -> Result<PrestacaoContas, RepositoryError>;

    async fn fetch_prestacao(
        &self,
        tenant_id: TenantId,
        prestacao_id: PrestacaoId,
    ) -> Result<Option<PrestacaoContas>, RepositoryError>;

    /// Compare-and-set on the stored status.
    async fn update_prestacao(
        &self,
        prestacao: PrestacaoContas,
        expected: PrestacaoStatus,
    ) -> Result<PrestacaoContas, RepositoryError>;

    async fn prestacoes_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<PrestacaoContas>, RepositoryError>;
}
