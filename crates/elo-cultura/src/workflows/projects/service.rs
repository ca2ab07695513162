use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Documento, HabilitationDecision, HabilitationStatus, NewDocument, ProjectDraft, Projeto,
    RankingEntry, SelectionStatus,
};
use super::repository::ProjectRepository;
use crate::context::{AccessDenied, RequestContext, Role};
use crate::ids::{DocumentoId, EditalId, ProjetoId};
use crate::notifications::{DirectoryRepository, NotificationDispatcher, NotificationEvent};
use crate::store::RepositoryError;
use crate::workflows::edital::{Edital, EditalRepository, Phase};
use crate::workflows::evaluation::{round2, EvaluationRepository};

const PROTOCOL_ATTEMPTS: usize = 3;

/// Submission intake, habilitation decisions and the final ranking.
pub struct ProjectService<R> {
    repository: Arc<R>,
    notifier: NotificationDispatcher,
}

impl<R> ProjectService<R>
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<R>, notifier: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Register a proponent's project while inscriptions are open.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
        draft: ProjectDraft,
    ) -> Result<Projeto, ProjectError> {
        ctx.require_role(Role::Proponente, "submit projects")?;
        let edital = self.load_edital(ctx, edital_id).await?;

        let now = Utc::now();
        if !edital.status.accepts_submissions() {
            return Err(ProjectError::WrongPhase { fase: edital.status });
        }
        if !edital.window_open(Phase::Inscricao, now) {
            return Err(ProjectError::WindowClosed { fase: Phase::Inscricao });
        }

        let titulo = draft.titulo.trim().to_string();
        if titulo.is_empty() {
            return Err(ProjectError::Invalid("titulo is required".to_string()));
        }
        if !draft.orcamento_total.is_finite() || draft.orcamento_total < 0.0 {
            return Err(ProjectError::Invalid(
                "orcamento_total must be a non-negative amount".to_string(),
            ));
        }

        let mut last_error = RepositoryError::Conflict;
        for _ in 0..PROTOCOL_ATTEMPTS {
            let projeto = Projeto {
                id: ProjetoId::new(),
                tenant_id: ctx.tenant_id,
                edital_id,
                proponente_id: ctx.actor_id,
                numero_protocolo: protocol_number(now),
                titulo: titulo.clone(),
                resumo: draft.resumo.trim().to_string(),
                descricao_tecnica: draft.descricao_tecnica.trim().to_string(),
                orcamento_total: draft.orcamento_total,
                cronograma_execucao: draft.cronograma_execucao.clone(),
                status_habilitacao: HabilitationStatus::Pendente,
                motivo_habilitacao: None,
                nota_final: None,
                status_selecao: SelectionStatus::Pendente,
                criado_em: now,
            };

            match self.repository.insert_project(projeto).await {
                Ok(stored) => {
                    info!(
                        projeto_id = %stored.id,
                        edital_id = %edital_id,
                        protocolo = %stored.numero_protocolo,
                        "project submitted"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) => last_error = RepositoryError::Conflict,
                Err(other) => return Err(other.into()),
            }
        }

        Err(last_error.into())
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
    ) -> Result<Projeto, ProjectError> {
        let projeto = self.load_project(ctx, projeto_id).await?;
        ensure_owner_or_manager(ctx, &projeto)?;
        Ok(projeto)
    }

    /// Managers see every project of the edital, proponents only their own.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<Projeto>, ProjectError> {
        self.load_edital(ctx, edital_id).await?;
        let projetos = self
            .repository
            .projects_for_edital(ctx.tenant_id, edital_id)
            .await?;
        Ok(projetos
            .into_iter()
            .filter(|projeto| ctx.role.is_manager() || projeto.proponente_id == ctx.actor_id)
            .collect())
    }

    pub async fn attach_document(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
        document: NewDocument,
    ) -> Result<Documento, ProjectError> {
        let projeto = self.load_project(ctx, projeto_id).await?;
        ensure_owner_or_manager(ctx, &projeto)?;
        if document.nome_arquivo.trim().is_empty() {
            return Err(ProjectError::Invalid("nome_arquivo is required".to_string()));
        }

        let documento = Documento {
            id: DocumentoId::new(),
            tenant_id: ctx.tenant_id,
            projeto_id,
            nome_arquivo: document.nome_arquivo.trim().to_string(),
            tipo_mime: document.tipo_mime,
            categoria: document.categoria,
            enviado_em: Utc::now(),
        };
        Ok(self.repository.insert_document(documento).await?)
    }

    pub async fn documents(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
    ) -> Result<Vec<Documento>, ProjectError> {
        let projeto = self.load_project(ctx, projeto_id).await?;
        ensure_owner_or_manager(ctx, &projeto)?;
        Ok(self
            .repository
            .documents_for_project(ctx.tenant_id, projeto_id)
            .await?)
    }

    /// Record the documentary-eligibility decision and notify the proponent.
    pub async fn decide_habilitation(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
        decision: HabilitationDecision,
        motivo: Option<String>,
    ) -> Result<Projeto, ProjectError> {
        ctx.require_manager("decide habilitation")?;
        let mut projeto = self.load_project(ctx, projeto_id).await?;
        let edital = self.load_edital(ctx, projeto.edital_id).await?;

        let motivo = motivo
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if decision == HabilitationDecision::Inabilitado && motivo.is_none() {
            return Err(ProjectError::Invalid(
                "motivo is required when declaring a project inabilitado".to_string(),
            ));
        }

        projeto.status_habilitacao = match decision {
            HabilitationDecision::Habilitado => HabilitationStatus::Habilitado,
            HabilitationDecision::Inabilitado => HabilitationStatus::Inabilitado,
        };
        projeto.motivo_habilitacao = motivo.clone();
        self.repository.update_project(projeto.clone()).await?;

        info!(
            projeto_id = %projeto_id,
            status = projeto.status_habilitacao.label(),
            "habilitation decided"
        );

        self.notify_proponent(
            &projeto,
            NotificationEvent::HabilitationDecided {
                edital_titulo: edital.titulo,
                protocolo: projeto.numero_protocolo.clone(),
                habilitado: decision == HabilitationDecision::Habilitado,
                motivo,
            },
        )
        .await;

        Ok(projeto)
    }

    /// Score every habilitado project by the mean of its finalized evaluations and split the
    /// ordered list into selecionado (up to `vagas`) and suplente.
    pub async fn compute_ranking(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Vec<RankingEntry>, ProjectError> {
        ctx.require_manager("compute rankings")?;
        let edital = self.load_edital(ctx, edital_id).await?;
        let projetos = self
            .repository
            .projects_for_edital(ctx.tenant_id, edital_id)
            .await?;
        let snapshot = self
            .repository
            .assignments_for_edital(ctx.tenant_id, edital_id)
            .await?;

        let mut totals: HashMap<ProjetoId, Vec<f64>> = HashMap::new();
        for avaliacao in snapshot.avaliacoes.iter().filter(|avaliacao| avaliacao.is_finalized()) {
            if let Some(total) = avaliacao.nota_total {
                totals.entry(avaliacao.projeto_id).or_default().push(total);
            }
        }

        let mut scored: Vec<(Projeto, Option<f64>, u32)> = projetos
            .into_iter()
            .map(|projeto| {
                let notas = totals.get(&projeto.id).map(Vec::as_slice).unwrap_or(&[]);
                let media = if notas.is_empty() {
                    None
                } else {
                    Some(round2(notas.iter().sum::<f64>() / notas.len() as f64))
                };
                let count = notas.len() as u32;
                (projeto, media, count)
            })
            .collect();

        scored.sort_by(|(left, left_score, _), (right, right_score, _)| {
            let left_key = rank_key(left, *left_score);
            let right_key = rank_key(right, *right_score);
            right_key
                .partial_cmp(&left_key)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.numero_protocolo.cmp(&right.numero_protocolo))
        });

        let mut ranking = Vec::with_capacity(scored.len());
        let mut position = 0u32;
        for (mut projeto, media, count) in scored {
            let eligible =
                projeto.status_habilitacao == HabilitationStatus::Habilitado && media.is_some();
            let (posicao, status) = if eligible {
                position += 1;
                let status = if position <= edital.vagas {
                    SelectionStatus::Selecionado
                } else {
                    SelectionStatus::Suplente
                };
                (Some(position), status)
            } else {
                (None, SelectionStatus::NaoSelecionado)
            };

            projeto.nota_final = media;
            projeto.status_selecao = status;
            self.repository.update_project(projeto.clone()).await?;

            ranking.push(RankingEntry {
                posicao,
                projeto_id: projeto.id,
                numero_protocolo: projeto.numero_protocolo,
                titulo: projeto.titulo,
                nota_final: media,
                avaliacoes_finalizadas: count,
                status_selecao: status,
            });
        }

        info!(edital_id = %edital_id, ranked = position, vagas = edital.vagas, "ranking computed");
        Ok(ranking)
    }

    async fn notify_proponent(&self, projeto: &Projeto, event: NotificationEvent) {
        match self
            .repository
            .contact(projeto.tenant_id, projeto.proponente_id)
            .await
        {
            Ok(Some(contact)) => {
                self.notifier.dispatch(event, vec![contact]);
            }
            Ok(None) => {
                warn!(
                    projeto_id = %projeto.id,
                    "proponent has no contact address; notification skipped"
                );
            }
            Err(err) => {
                warn!(
                    projeto_id = %projeto.id,
                    error = %err,
                    "unable to resolve proponent contact"
                );
            }
        }
    }

    async fn load_edital(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Edital, ProjectError> {
        self.repository
            .fetch_edital(ctx.tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .ok_or(ProjectError::EditalNotFound(edital_id))
    }

    async fn load_project(
        &self,
        ctx: &RequestContext,
        projeto_id: ProjetoId,
    ) -> Result<Projeto, ProjectError> {
        self.repository
            .fetch_project(ctx.tenant_id, projeto_id)
            .await?
            .ok_or(ProjectError::ProjectNotFound(projeto_id))
    }
}

/// Ineligible projects sort after every eligible one.
fn rank_key(projeto: &Projeto, media: Option<f64>) -> f64 {
    match (projeto.status_habilitacao, media) {
        (HabilitationStatus::Habilitado, Some(score)) => score,
        _ => f64::NEG_INFINITY,
    }
}

fn ensure_owner_or_manager(ctx: &RequestContext, projeto: &Projeto) -> Result<(), ProjectError> {
    if ctx.role.is_manager() || projeto.proponente_id == ctx.actor_id {
        Ok(())
    } else {
        Err(ProjectError::ProjectNotFound(projeto.id))
    }
}

/// `EC-{timestamp}-{suffix}`; the suffix keeps same-second submissions apart.
pub fn protocol_number(at: chrono::DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "EC-{}-{}",
        at.format("%Y%m%d%H%M%S"),
        suffix[..4].to_ascii_uppercase()
    )
}

/// Error raised by project intake and decisions.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("edital {0} not found")]
    EditalNotFound(EditalId),
    #[error("project {0} not found")]
    ProjectNotFound(ProjetoId),
    #[error("submissions are not accepted while the edital is in phase {fase}")]
    WrongPhase { fase: Phase },
    #[error("the {fase} window is closed")]
    WindowClosed { fase: Phase },
    #[error("invalid project: {0}")]
    Invalid(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
