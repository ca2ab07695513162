use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Edital, EditalFase, NewEdital, Phase, PhaseAdvance, PhaseCompleteness, PhaseTransition,
};
use super::repository::EditalRepository;
use crate::context::{AccessDenied, RequestContext};
use crate::ids::{EditalId, TenantId};
use crate::notifications::{DirectoryRepository, NotificationDispatcher, NotificationEvent};
use crate::store::RepositoryError;

/// Drives an edital through [`Phase::ordered`], one step per call.
///
/// There is no rollback and no jump. Advancing is not idempotent: two calls move
/// two phases, so callers debounce. The read-then-write is guarded by the edital version, so of
/// two racing advances only one lands and the other reports [`EditalError::Conflict`].
pub struct EditalStateMachine<R> {
    repository: Arc<R>,
    notifier: NotificationDispatcher,
}

impl<R> EditalStateMachine<R>
where
    R: EditalRepository + DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<R>, notifier: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        draft: NewEdital,
    ) -> Result<Edital, EditalError> {
        ctx.require_manager("create editais")?;

        let numero = draft.numero.trim().to_string();
        let titulo = draft.titulo.trim().to_string();
        if numero.is_empty() || titulo.is_empty() {
            return Err(EditalError::Invalid(
                "numero and titulo are required".to_string(),
            ));
        }
        if let Some((phase, _)) = draft
            .janelas
            .iter()
            .find(|(_, window)| window.fim < window.inicio)
        {
            return Err(EditalError::Invalid(format!(
                "window for {phase} ends before it starts"
            )));
        }

        let edital = Edital {
            id: EditalId::new(),
            tenant_id: ctx.tenant_id,
            numero,
            titulo,
            descricao: draft.descricao,
            status: Phase::Criacao,
            janelas: draft.janelas,
            vagas: draft.vagas,
            ativo: true,
            version: 0,
            criado_em: Utc::now(),
        };

        let stored = self.repository.insert_edital(edital).await?;
        info!(edital_id = %stored.id, tenant_id = %stored.tenant_id, "edital created");
        Ok(stored)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Edital, EditalError> {
        self.load(ctx.tenant_id, edital_id).await
    }

    /// Move the edital to the next phase, returning the completeness snapshot of the phase it
    /// just left.
    pub async fn advance(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<PhaseAdvance, EditalError> {
        ctx.require_manager("advance edital phases")?;

        let edital = self.load(ctx.tenant_id, edital_id).await?;
        let next = edital
            .status
            .next()
            .ok_or(EditalError::TerminalState { edital_id })?;

        let completude_anterior = self
            .repository
            .completeness(ctx.tenant_id, edital_id)
            .await?;

        let transition = PhaseTransition {
            tenant_id: ctx.tenant_id,
            edital_id,
            expected_version: edital.version,
            from: edital.status,
            to: next,
            at: Utc::now(),
        };

        let updated = self
            .repository
            .transition_phase(transition)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => EditalError::Conflict { edital_id },
                RepositoryError::NotFound => EditalError::NotFound(edital_id),
                other => EditalError::Repository(other),
            })?;

        info!(
            edital_id = %edital_id,
            from = %edital.status,
            to = %updated.status,
            actor = %ctx.actor_id,
            "edital phase advanced"
        );

        let notificacoes_enfileiradas = if next.is_notifiable() {
            self.notify_proponents(&updated).await
        } else {
            0
        };

        Ok(PhaseAdvance {
            edital_id,
            fase_anterior: edital.status,
            fase: updated.status,
            completude_anterior,
            notificacoes_enfileiradas,
        })
    }

    pub async fn completeness(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<PhaseCompleteness, EditalError> {
        ctx.require_manager("inspect edital progress")?;
        self.load(ctx.tenant_id, edital_id).await?;
        Ok(self
            .repository
            .completeness(ctx.tenant_id, edital_id)
            .await?)
    }

    pub async fn history(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<EditalFase>, EditalError> {
        self.load(ctx.tenant_id, edital_id).await?;
        Ok(self
            .repository
            .phase_history(ctx.tenant_id, edital_id)
            .await?)
    }

    async fn load(&self, tenant_id: TenantId, edital_id: EditalId) -> Result<Edital, EditalError> {
        self.repository
            .fetch_edital(tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .ok_or(EditalError::NotFound(edital_id))
    }

    async fn notify_proponents(&self, edital: &Edital) -> usize {
        let recipients = match self
            .repository
            .proponent_contacts(edital.tenant_id, edital.id)
            .await
        {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!(
                    edital_id = %edital.id,
                    error = %err,
                    "unable to resolve proponents for notification"
                );
                return 0;
            }
        };

        self.notifier.dispatch(
            NotificationEvent::PhaseChanged {
                edital_numero: edital.numero.clone(),
                edital_titulo: edital.titulo.clone(),
                fase: edital.status,
            },
            recipients,
        )
    }
}

/// Error raised by the edital state machine.
#[derive(Debug, thiserror::Error)]
pub enum EditalError {
    #[error("edital {0} not found")]
    NotFound(EditalId),
    #[error("edital {edital_id} is archived; no further phase exists")]
    TerminalState { edital_id: EditalId },
    #[error("edital {edital_id} changed concurrently; reload and retry")]
    Conflict { edital_id: EditalId },
    #[error("invalid edital: {0}")]
    Invalid(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
