use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{AppealDecision, NewRecurso, Recurso, RecursoStatus, RecursoTipo};
use super::repository::AppealRepository;
use crate::context::{AccessDenied, RequestContext, Role};
use crate::ids::{EditalId, ProjetoId, RecursoId};
use crate::notifications::{DirectoryRepository, NotificationDispatcher, NotificationEvent};
use crate::store::RepositoryError;
use crate::workflows::edital::{Edital, EditalRepository, Phase};
use crate::workflows::projects::{ProjectRepository, Projeto};

/// Appeals against inscription, evaluation and habilitation outcomes.
pub struct AppealService<R> {
    repository: Arc<R>,
    notifier: NotificationDispatcher,
}

impl<R> AppealService<R>
where
    R: EditalRepository + ProjectRepository + AppealRepository + DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<R>, notifier: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// File an appeal on one of the proponent's own projects during the matching appeal phase.
    pub async fn file(
        &self,
        ctx: &RequestContext,
        draft: NewRecurso,
    ) -> Result<Recurso, AppealError> {
        ctx.require_role(Role::Proponente, "file appeals")?;
        let projeto = self.load_project(ctx, draft.projeto_id).await?;
        if projeto.proponente_id != ctx.actor_id {
            return Err(AppealError::ProjectNotFound(draft.projeto_id));
        }
        let edital = self.load_edital(ctx, projeto.edital_id).await?;

        let fase = draft.tipo.phase();
        if edital.status != fase {
            return Err(AppealError::WrongPhase {
                tipo: draft.tipo,
                fase: edital.status,
            });
        }
        let now = Utc::now();
        if !edital.window_open(fase, now) {
            return Err(AppealError::WindowClosed { fase });
        }

        let fundamentacao = draft.fundamentacao.trim().to_string();
        if fundamentacao.is_empty() {
            return Err(AppealError::Invalid("fundamentacao is required".to_string()));
        }

        let recurso = Recurso {
            id: RecursoId::new(),
            tenant_id: ctx.tenant_id,
            edital_id: edital.id,
            projeto_id: projeto.id,
            proponente_id: ctx.actor_id,
            tipo: draft.tipo,
            fundamentacao,
            status: RecursoStatus::Pendente,
            resposta: None,
            decidido_por: None,
            criado_em: now,
            decidido_em: None,
        };

        let stored = self
            .repository
            .insert_recurso(recurso)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => AppealError::AlreadyOpen {
                    projeto_id: projeto.id,
                    tipo: draft.tipo,
                },
                other => AppealError::Repository(other),
            })?;

        info!(
            recurso_id = %stored.id,
            projeto_id = %projeto.id,
            tipo = draft.tipo.label(),
            "appeal filed"
        );
        Ok(stored)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        recurso_id: RecursoId,
    ) -> Result<Recurso, AppealError> {
        let recurso = self.load_recurso(ctx, recurso_id).await?;
        if !ctx.role.is_manager() && recurso.proponente_id != ctx.actor_id {
            return Err(AppealError::RecursoNotFound(recurso_id));
        }
        Ok(recurso)
    }

    /// Managers see every appeal of the edital, proponents only their own.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<Recurso>, AppealError> {
        self.load_edital(ctx, edital_id).await?;
        let recursos = self
            .repository
            .recursos_for_edital(ctx.tenant_id, edital_id)
            .await?;
        Ok(recursos
            .into_iter()
            .filter(|recurso| ctx.role.is_manager() || recurso.proponente_id == ctx.actor_id)
            .collect())
    }

    pub async fn start_analysis(
        &self,
        ctx: &RequestContext,
        recurso_id: RecursoId,
    ) -> Result<Recurso, AppealError> {
        ctx.require_manager("analyse appeals")?;
        let mut recurso = self.load_recurso(ctx, recurso_id).await?;
        let expected = transition(&recurso, RecursoStatus::EmAnalise)?;
        recurso.status = RecursoStatus::EmAnalise;
        self.store(recurso, expected).await
    }

    /// Close an appeal under analysis and notify its proponent.
    pub async fn decide(
        &self,
        ctx: &RequestContext,
        recurso_id: RecursoId,
        decision: AppealDecision,
        resposta: String,
    ) -> Result<Recurso, AppealError> {
        ctx.require_manager("decide appeals")?;
        let resposta = resposta.trim().to_string();
        if resposta.is_empty() {
            return Err(AppealError::Invalid("resposta is required".to_string()));
        }

        let mut recurso = self.load_recurso(ctx, recurso_id).await?;
        let next = RecursoStatus::from(decision);
        let expected = transition(&recurso, next)?;
        recurso.status = next;
        recurso.resposta = Some(resposta.clone());
        recurso.decidido_por = Some(ctx.actor_id);
        recurso.decidido_em = Some(Utc::now());
        let decided = self.store(recurso, expected).await?;

        info!(recurso_id = %recurso_id, status = next.label(), "appeal decided");

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
                    NotificationEvent::AppealDecided {
                        protocolo,
                        deferido: decision == AppealDecision::Deferido,
                        resposta,
                    },
                    vec![contact],
                );
            }
            Ok(None) => warn!(recurso_id = %recurso_id, "proponent has no contact address"),
            Err(err) => warn!(
                recurso_id = %recurso_id,
                error = %err,
                "unable to resolve proponent contact"
            ),
        }

        Ok(decided)
    }

    async fn store(
        &self,
        recurso: Recurso,
        expected: RecursoStatus,
    ) -> Result<Recurso, AppealError> {
        let recurso_id = recurso.id;
        let next = recurso.status;
        self.repository
            .update_recurso(recurso, expected)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => AppealError::InvalidTransition {
                    recurso_id,
                    from: expected,
                    to: next,
                },
                other => AppealError::Repository(other),
            })
    }

    async fn load_recurso(
        &self,
        ctx: &RequestContext,
        recurso_id: RecursoId,
    ) -> Result<Recurso, AppealError> {
        self.repository
            .fetch_recurso(ctx.tenant_id, recurso_id)
            .await?
            .ok_or(AppealError::RecursoNotFound(recurso_id))
    }

    async fn load_project(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
    ) -> Result<Projeto, AppealError> {
        self.repository
            .fetch_project(ctx.tenant_id, projeto_id)
            .await?
            .ok_or(AppealError::ProjectNotFound(projeto_id))
    }

    async fn load_edital(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Edital, AppealError> {
        self.repository
            .fetch_edital(ctx.tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .ok_or(AppealError::EditalNotFound(edital_id))
    }
}

fn transition(recurso: &Recurso, next: RecursoStatus) -> Result<RecursoStatus, AppealError> {
    if recurso.status.can_become(next) {
        Ok(recurso.status)
    } else {
        Err(AppealError::InvalidTransition {
            recurso_id: recurso.id,
            from: recurso.status,
            to: next,
        })
    }
}

/// Error raised by appeal filing and review.
#[derive(Debug, thiserror::Error)]
pub enum AppealError {
    #[error("edital {0} not found")]
    EditalNotFound(EditalId),
    #[error("project {0} not found")]
    ProjectNotFound(ProjetoId),
    #[error("appeal {0} not found")]
    RecursoNotFound(RecursoId),
    #[error("{} appeals cannot be filed while the edital is in phase {fase}", .tipo.label())]
    WrongPhase { tipo: RecursoTipo, fase: Phase },
    #[error("the {fase} window is closed")]
    WindowClosed { fase: Phase },
    #[error("project {projeto_id} already has an open {} appeal", .tipo.label())]
    AlreadyOpen {
        projeto_id: ProjetoId,
        tipo: RecursoTipo,
    },
    #[error("appeal {recurso_id} cannot move from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        recurso_id: RecursoId,
        from: RecursoStatus,
        to: RecursoStatus,
    },
    #[error("invalid appeal: {0}")]
    Invalid(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
