use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{AccountabilityDraft, PrestacaoContas, PrestacaoStatus, ReviewDecision};
use super::repository::AccountabilityRepository;
use crate::context::{AccessDenied, RequestContext, Role};
use crate::ids::{EditalId, PrestacaoId, ProjetoId};
use crate::notifications::{DirectoryRepository, NotificationDispatcher, NotificationEvent};
use crate::store::RepositoryError;
use crate::workflows::projects::{ProjectRepository, Projeto, SelectionStatus};

/// Accountability reports of selected projects.
pub struct AccountabilityService<R> {
    repository: Arc<R>,
    notifier: NotificationDispatcher,
}

impl<R> AccountabilityService<R>
where
    R: ProjectRepository + AccountabilityRepository + DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<R>, notifier: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Open a draft report for one of the proponent's selected projects.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
        draft: AccountabilityDraft,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        ctx.require_role(Role::Proponente, "report on project execution")?;
        let projeto = self.load_project(ctx, projeto_id).await?;
        if projeto.proponente_id != ctx.actor_id {
            return Err(AccountabilityError::ProjectNotFound(projeto_id));
        }
        if projeto.status_selecao != SelectionStatus::Selecionado {
            return Err(AccountabilityError::NotSelected(projeto_id));
        }
        validate(&draft)?;

        let now = Utc::now();
        let prestacao = PrestacaoContas {
            id: PrestacaoId::new(),
            tenant_id: ctx.tenant_id,
            edital_id: projeto.edital_id,
            projeto_id,
            proponente_id: ctx.actor_id,
            relatorio_atividades: draft.relatorio_atividades.trim().to_string(),
            valor_executado: draft.valor_executado,
            status: PrestacaoStatus::Rascunho,
            parecer: None,
            analisado_por: None,
            criado_em: now,
            atualizado_em: now,
            enviado_em: None,
        };

        self.repository
            .insert_prestacao(prestacao)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => AccountabilityError::AlreadyExists(projeto_id),
                other => AccountabilityError::Repository(other),
            })
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        let prestacao = self.load(ctx, prestacao_id).await?;
        if !ctx.role.is_manager() && prestacao.proponente_id != ctx.actor_id {
            return Err(AccountabilityError::NotFound(prestacao_id));
        }
        Ok(prestacao)
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<PrestacaoContas>, AccountabilityError> {
        ctx.require_manager("review accountability reports")?;
        Ok(self
            .repository
            .prestacoes_for_edital(ctx.tenant_id, edital_id)
            .await?)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
        draft: AccountabilityDraft,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        let mut prestacao = self.load_own(ctx, prestacao_id).await?;
        if !prestacao.status.is_editable() {
            return Err(AccountabilityError::NotEditable {
                prestacao_id,
                status: prestacao.status,
            });
        }
        validate(&draft)?;

        let expected = prestacao.status;
        prestacao.relatorio_atividades = draft.relatorio_atividades.trim().to_string();
        prestacao.valor_executado = draft.valor_executado;
        prestacao.atualizado_em = Utc::now();
        self.store(prestacao, expected).await
    }

    pub async fn submit(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        let mut prestacao = self.load_own(ctx, prestacao_id).await?;
        if prestacao.relatorio_atividades.is_empty() {
            return Err(AccountabilityError::Invalid(
                "relatorio_atividades is required before submitting".to_string(),
            ));
        }
        let expected = transition(&prestacao, PrestacaoStatus::Enviada)?;
        let now = Utc::now();
        prestacao.status = PrestacaoStatus::Enviada;
        prestacao.enviado_em = Some(now);
        prestacao.atualizado_em = now;
        let stored = self.store(prestacao, expected).await?;
        info!(
            prestacao_id = %prestacao_id,
            projeto_id = %stored.projeto_id,
            "accountability report submitted"
        );
        Ok(stored)
    }

    pub async fn start_review(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        ctx.require_manager("review accountability reports")?;
        let mut prestacao = self.load(ctx, prestacao_id).await?;
        let expected = transition(&prestacao, PrestacaoStatus::EmAnalise)?;
        prestacao.status = PrestacaoStatus::EmAnalise;
        prestacao.analisado_por = Some(ctx.actor_id);
        prestacao.atualizado_em = Utc::now();
        self.store(prestacao, expected).await
    }

    /// Record the review outcome and notify the proponent. Rejections and pendencies need an
    /// opinion the proponent can act on.
    pub async fn decide(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
        decision: ReviewDecision,
        parecer: Option<String>,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        ctx.require_manager("review accountability reports")?;
        let parecer = parecer
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if decision != ReviewDecision::Aprovada && parecer.is_none() {
            return Err(AccountabilityError::Invalid(
                "parecer is required unless the report is approved".to_string(),
            ));
        }

        let mut prestacao = self.load(ctx, prestacao_id).await?;
        let next = PrestacaoStatus::from(decision);
        let expected = transition(&prestacao, next)?;
        prestacao.status = next;
        prestacao.parecer = parecer.clone();
        prestacao.analisado_por = Some(ctx.actor_id);
        prestacao.atualizado_em = Utc::now();
        let decided = self.store(prestacao, expected).await?;

        info!(
            prestacao_id = %prestacao_id,
            status = next.label(),
            "accountability report reviewed"
        );

        let protocolo = match self.load_project(ctx, decided.projeto_id).await {
            Ok(projeto) => projeto.numero_protocolo,
            Err(_) => decided.projeto_id.to_string(),
        };
        match self
            .repository
            .contact(ctx.tenant_id, decided.proponente_id)
            .await
        {
            Ok(Some(contact)) => {
                self.notifier.dispatch(
                    NotificationEvent::AccountabilityDecided {
                        protocolo,
                        situacao: next.label(),
                        parecer,
                    },
                    vec![contact],
                );
            }
            Ok(None) => warn!(prestacao_id = %prestacao_id, "proponent has no contact address"),
            Err(err) => warn!(
                prestacao_id = %prestacao_id,
                error = %err,
                "unable to resolve proponent contact"
            ),
        }

        Ok(decided)
    }

    async fn store(
        &self,
        prestacao: PrestacaoContas,
        expected: PrestacaoStatus,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        let prestacao_id = prestacao.id;
        let next = prestacao.status;
        self.repository
            .update_prestacao(prestacao, expected)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => AccountabilityError::InvalidTransition {
                    prestacao_id,
                    from: expected,
                    to: next,
                },
                other => AccountabilityError::Repository(other),
            })
    }

    async fn load_own(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        ctx.require_role(Role::Proponente, "edit accountability reports")?;
        let prestacao = self.load(ctx, prestacao_id).await?;
        if prestacao.proponente_id != ctx.actor_id {
            return Err(AccountabilityError::NotFound(prestacao_id));
        }
        Ok(prestacao)
    }

    async fn load(
        &self,
        ctx: &RequestContext,
        prestacao_id: PrestacaoId,
    ) -> Result<PrestacaoContas, AccountabilityError> {
        self.repository
            .fetch_prestacao(ctx.tenant_id, prestacao_id)
            .await?
            .ok_or(AccountabilityError::NotFound(prestacao_id))
    }

    async fn load_project(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
    ) -> Result<Projeto, AccountabilityError> {
        self.repository
            .fetch_project(ctx.tenant_id, projeto_id)
            .await?
            .ok_or(AccountabilityError::ProjectNotFound(projeto_id))
    }
}

fn validate(draft: &AccountabilityDraft) -> Result<(), AccountabilityError> {
    if !draft.valor_executado.is_finite() || draft.valor_executado < 0.0 {
        return Err(AccountabilityError::Invalid(
            "valor_executado must be a non-negative amount".to_string(),
        ));
    }
    Ok(())
}

fn transition(
    prestacao: &PrestacaoContas,
    next: PrestacaoStatus,
) -> Result<PrestacaoStatus, AccountabilityError> {
    if prestacao.status.can_become(next) {
        Ok(prestacao.status)
    } else {
        Err(AccountabilityError::InvalidTransition {
            prestacao_id: prestacao.id,
            from: prestacao.status,
            to: next,
        })
    }
}

/// Error raised by accountability reporting and review.
#[derive(Debug, thiserror::Error)]
pub enum AccountabilityError {
    #[error("accountability report {0} not found")]
    NotFound(PrestacaoId),
    #[error("project {0} not found")]
    ProjectNotFound(ProjetoId),
    #[error("project {0} was not selected and owes no accountability report")]
    NotSelected(ProjetoId),
    #[error("project {0} already has an accountability report")]
    AlreadyExists(ProjetoId),
    #[error("accountability report {prestacao_id} cannot be edited while {}", .status.label())]
    NotEditable {
        prestacao_id: PrestacaoId,
        status: PrestacaoStatus,
    },
    #[error(
        "accountability report {prestacao_id} cannot move from {} to {}",
        .from.label(),
        .to.label()
    )]
    InvalidTransition {
        prestacao_id: PrestacaoId,
        from: PrestacaoStatus,
        to: PrestacaoStatus,
    },
    #[error("invalid accountability report: {0}")]
    Invalid(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
