use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    ExecutionStatus, IrregularityFlag, TriageResultDetail, TriagemExecucao, TriagemNota,
    TriagemResultado,
};
use crate::ids::{EditalId, ExecucaoId, ResultadoId, TenantId};
use crate::store::RepositoryError;

/// Storage abstraction for triage runs and their per-project output.
#[async_trait]
pub trait TriageRepository: Send + Sync {
    async fn insert_execution(
        &self,
        execucao: TriagemExecucao,
    ) -> Result<TriagemExecucao, RepositoryError>;

    async fn fetch_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
    ) -> Result<Option<TriagemExecucao>, RepositoryError>;

    /// Reset the project count of a running execution to the set actually being analysed.
    async fn rescope_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        total_projetos: u32,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Checkpoint after each analysed project; also refreshes `atualizado_em`.
    async fn record_progress(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        projetos_analisados: u32,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn finish_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        status: ExecutionStatus,
        erro_mensagem: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<TriagemExecucao, RepositoryError>;

    /// Every run still em_andamento, across tenants.
    async fn running_executions(&self) -> Result<Vec<TriagemExecucao>, RepositoryError>;

    /// Most recent concluded run of the edital by start time.
    async fn latest_concluded(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Option<TriagemExecucao>, RepositoryError>;

    async fn insert_result(
        &self,
        resultado: TriagemResultado,
        notas: Vec<TriagemNota>,
    ) -> Result<(), RepositoryError>;

    async fn attach_flags(
        &self,
        tenant_id: TenantId,
        resultado_id: ResultadoId,
        flags: Vec<IrregularityFlag>,
        similaridade_maxima: f64,
    ) -> Result<(), RepositoryError>;

    /// Results in insertion order with their notes.
    async fn results_for_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
    ) -> Result<Vec<TriageResultDetail>, RepositoryError>;
}
