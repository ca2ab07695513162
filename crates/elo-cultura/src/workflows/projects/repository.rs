use async_trait::async_trait;

use super::domain::{Documento, Projeto};
use crate::ids::{EditalId, ProjetoId, TenantId};
use crate::store::RepositoryError;

/// Storage abstraction for submitted projects and their attachments.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the protocol number is taken.
    async fn insert_project(&self, projeto: Projeto) -> Result<Projeto, RepositoryError>;

    async fn update_project(&self, projeto: Projeto) -> Result<(), RepositoryError>;

    async fn fetch_project(
        &self,
        tenant_id: TenantId,
        projeto_id: ProjetoId,
    ) -> Result<Option<Projeto>, RepositoryError>;

    /// Projects of an edital in a stable order (submission time, then protocol).
    async fn projects_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Projeto>, RepositoryError>;

    async fn insert_document(&self, documento: Documento) -> Result<Documento, RepositoryError>;

    async fn documents_for_project(
        &self,
        tenant_id: TenantId,
        projeto_id: ProjetoId,
    ) -> Result<Vec<Documento>, RepositoryError>;
}
