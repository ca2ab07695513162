use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use super::domain::{
    ExecutionStatus, FlagKind, IrregularityFlag, TriageReport, TriageResultDetail,
    TriagemExecucao, TriagemNota, TriagemResultado,
};
use super::gate::RunGate;
use super::model::{ChatPrompt, ProviderError, TriageModel};
use super::prompts::{habilitation_prompt, scoring_prompt};
use super::repository::TriageRepository;
use super::schema::{decode_habilitation, decode_scores, HabilitationAnalysis, SuggestedScore};
use super::similarity::{SimilarityDetector, SimilarityInput};
use crate::config::{AiConfig, TriageConfig};
use crate::context::{AccessDenied, RequestContext, Role};
use crate::ids::{EditalId, ExecucaoId, ProjetoId, ResultadoId};
use crate::store::RepositoryError;
use crate::workflows::edital::{Edital, EditalRepository};
use crate::workflows::evaluation::{
    weighted_average, Criterio, EvaluationRepository, WeightedScore,
};
use crate::workflows::projects::{Documento, ProjectRepository, Projeto};

/// Runtime knobs of the triage pipeline.
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub runs_per_hour: u32,
    pub stale_after: chrono::Duration,
    pub similarity_threshold: f64,
    pub call_timeout: Duration,
}

impl TriageSettings {
    pub fn from_config(triage: &TriageConfig, ai: &AiConfig) -> Self {
        Self {
            runs_per_hour: triage.runs_per_hour,
            stale_after: chrono::Duration::minutes(triage.stale_after_minutes),
            similarity_threshold: triage.similarity_threshold,
            call_timeout: ai.timeout,
        }
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            runs_per_hour: 3,
            stale_after: chrono::Duration::minutes(30),
            similarity_threshold: 0.8,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// AI-assisted pre-analysis of every project in an edital.
///
/// A run walks the projects sequentially, checkpointing progress after each one. Model failures
/// are contained per project and replaced by documented defaults; only store failures abort the
/// run, which is then recorded as `erro`.
pub struct TriageOrchestrator<R> {
    repository: Arc<R>,
    model: Arc<dyn TriageModel>,
    gate: RunGate,
    detector: SimilarityDetector,
    settings: TriageSettings,
    tracker: TaskTracker,
}

impl<R> TriageOrchestrator<R>
where
    R: EditalRepository + ProjectRepository + EvaluationRepository + TriageRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        model: Arc<dyn TriageModel>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            repository,
            model,
            gate: RunGate::new(settings.runs_per_hour),
            detector: SimilarityDetector::new(settings.similarity_threshold),
            settings,
            tracker: TaskTracker::new(),
        }
    }

    /// Validate the caller and create the execution record. Nothing is analysed yet.
    pub async fn begin(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<TriagemExecucao, TriageError> {
        ctx.require_manager("run AI triage")?;
        self.load_edital(ctx, edital_id).await?;

        let now = Utc::now();
        self.reconcile_stale(now).await?;

        let total_projetos = self
            .repository
            .projects_for_edital(ctx.tenant_id, edital_id)
            .await?
            .len() as u32;

        // The limiter has no refund, so only the final insert can spend a slot and still fail.
        self.gate
            .admit(ctx)
            .map_err(|limit| TriageError::RateLimited { limit })?;
        let execucao = self
            .repository
            .insert_execution(TriagemExecucao {
                id: ExecucaoId::new(),
                tenant_id: ctx.tenant_id,
                edital_id,
                status: ExecutionStatus::EmAndamento,
                total_projetos,
                projetos_analisados: 0,
                erro_mensagem: None,
                iniciado_por: ctx.actor_id,
                iniciado_em: now,
                atualizado_em: now,
                finalizado_em: None,
            })
            .await?;

        info!(
            execucao_id = %execucao.id,
            edital_id = %edital_id,
            total_projetos,
            "triage run started"
        );
        Ok(execucao)
    }

    /// Drive a begun execution to `concluida`, or to `erro` when the store fails.
    pub async fn run(
        &self,
        ctx: RequestContext,
        execucao: TriagemExecucao,
    ) -> Result<TriagemExecucao, TriageError> {
        let outcome = self.execute(&ctx, &execucao).await;
        let (status, message) = match &outcome {
            Ok(()) => (ExecutionStatus::Concluida, None),
            Err(err) => {
                error!(execucao_id = %execucao.id, error = %err, "triage run aborted");
                (ExecutionStatus::Erro, Some(err.to_string()))
            }
        };

        let finished = self
            .repository
            .finish_execution(ctx.tenant_id, execucao.id, status, message, Utc::now())
            .await?;

        info!(
            execucao_id = %finished.id,
            status = finished.status.label(),
            projetos_analisados = finished.projetos_analisados,
            "triage run finished"
        );
        Ok(finished)
    }

    /// [`Self::begin`] followed by [`Self::run`] on the caller's task.
    pub async fn run_to_completion(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<TriagemExecucao, TriageError> {
        let execucao = self.begin(ctx, edital_id).await?;
        self.run(*ctx, execucao).await
    }

    /// Run a begun execution on a tracked background task.
    pub fn spawn_run(self: &Arc<Self>, ctx: RequestContext, execucao: TriagemExecucao) {
        let orchestrator = Arc::clone(self);
        self.tracker.spawn(async move {
            let execucao_id = execucao.id;
            if let Err(err) = orchestrator.run(ctx, execucao).await {
                error!(execucao_id = %execucao_id, error = %err, "unable to record triage outcome");
            }
        });
    }

    /// Wait for every background run to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub async fn status(
        &self,
        ctx: &RequestContext,
        execucao_id: ExecucaoId,
    ) -> Result<TriagemExecucao, TriageError> {
        ctx.require_manager("view triage runs")?;
        self.repository
            .fetch_execution(ctx.tenant_id, execucao_id)
            .await?
            .ok_or(TriageError::ExecutionNotFound(execucao_id))
    }

    pub async fn results(
        &self,
        ctx: &RequestContext,
        execucao_id: ExecucaoId,
    ) -> Result<Vec<TriageResultDetail>, TriageError> {
        self.status(ctx, execucao_id).await?;
        Ok(self
            .repository
            .results_for_execution(ctx.tenant_id, execucao_id)
            .await?)
    }

    /// Results of the edital's most recent concluded run.
    pub async fn latest_results(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<TriageReport, TriageError> {
        ctx.require_manager("view triage runs")?;
        self.load_edital(ctx, edital_id).await?;
        let execucao = self
            .repository
            .latest_concluded(ctx.tenant_id, edital_id)
            .await?
            .ok_or(TriageError::NoConcludedRun(edital_id))?;
        let resultados = self
            .repository
            .results_for_execution(ctx.tenant_id, execucao.id)
            .await?;
        Ok(TriageReport {
            execucao,
            resultados,
        })
    }

    /// Operator entry point for [`Self::reconcile_stale`].
    pub async fn reconcile(&self, ctx: &RequestContext) -> Result<Vec<ExecucaoId>, TriageError> {
        ctx.require_role(Role::SuperAdmin, "reconcile triage runs")?;
        self.reconcile_stale(Utc::now()).await
    }

    /// Mark as `erro` every running execution whose last checkpoint is older than the
    /// staleness window.
    pub async fn reconcile_stale(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExecucaoId>, TriageError> {
        let cutoff = now - self.settings.stale_after;
        let mut reconciled = Vec::new();

        for execucao in self.repository.running_executions().await? {
            if execucao.atualizado_em >= cutoff {
                continue;
            }
            let message = format!(
                "Execução interrompida: sem progresso desde {}",
                execucao.atualizado_em.to_rfc3339()
            );
            match self
                .repository
                .finish_execution(
                    execucao.tenant_id,
                    execucao.id,
                    ExecutionStatus::Erro,
                    Some(message),
                    now,
                )
                .await
            {
                Ok(_) => {
                    warn!(execucao_id = %execucao.id, "stale triage run marked as erro");
                    reconciled.push(execucao.id);
                }
                Err(RepositoryError::Conflict) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(reconciled)
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        execucao: &TriagemExecucao,
    ) -> Result<(), TriageError> {
        let projetos = self
            .repository
            .projects_for_edital(ctx.tenant_id, execucao.edital_id)
            .await?;
        let criterios = self
            .repository
            .criteria_for_edital(ctx.tenant_id, execucao.edital_id)
            .await?;

        let total_projetos = projetos.len() as u32;
        if total_projetos != execucao.total_projetos {
            warn!(
                execucao_id = %execucao.id,
                contados = execucao.total_projetos,
                total_projetos,
                "project set changed since the run began"
            );
            self.repository
                .rescope_execution(ctx.tenant_id, execucao.id, total_projetos, Utc::now())
                .await?;
        }

        let mut resultados: HashMap<ProjetoId, ResultadoId> = HashMap::new();
        for (index, projeto) in projetos.iter().enumerate() {
            let documentos = self
                .repository
                .documents_for_project(ctx.tenant_id, projeto.id)
                .await?;

            let habilitation = self.analyse_habilitation(projeto, &documentos).await;
            let scores = self.suggest_scores(projeto, &criterios).await;
            let nota_agregada = weighted_average(criterios.iter().zip(&scores).map(
                |(criterio, score)| WeightedScore {
                    nota: Some(score.nota),
                    peso: criterio.peso,
                },
            ));

            let resultado_id = ResultadoId::new();
            let notas = scores
                .into_iter()
                .map(|score| TriagemNota {
                    resultado_id,
                    criterio_id: score.criterio_id,
                    nota_sugerida: score.nota,
                    justificativa: score.justificativa,
                    confianca: score.confianca,
                })
                .collect();
            self.repository
                .insert_result(
                    TriagemResultado {
                        id: resultado_id,
                        tenant_id: ctx.tenant_id,
                        execucao_id: execucao.id,
                        projeto_id: projeto.id,
                        sugestao_habilitacao: habilitation.sugestao,
                        motivo_habilitacao: habilitation.motivo,
                        docs_completos: habilitation.docs_completos,
                        problemas_documentos: habilitation.problemas,
                        nota_agregada,
                        irregularidades: Vec::new(),
                        similaridade_maxima: 0.0,
                        criado_em: Utc::now(),
                    },
                    notas,
                )
                .await?;
            resultados.insert(projeto.id, resultado_id);

            self.repository
                .record_progress(ctx.tenant_id, execucao.id, (index + 1) as u32, Utc::now())
                .await?;
        }

        self.attach_similarity_flags(ctx, &projetos, &resultados).await
    }

    async fn attach_similarity_flags(
        &self,
        ctx: &RequestContext,
        projetos: &[Projeto],
        resultados: &HashMap<ProjetoId, ResultadoId>,
    ) -> Result<(), TriageError> {
        let inputs: Vec<SimilarityInput> = projetos
            .iter()
            .map(|projeto| SimilarityInput {
                projeto_id: projeto.id,
                titulo: projeto.titulo.clone(),
                texto: format!("{}\n{}", projeto.resumo, projeto.descricao_tecnica),
                orcamento: projeto.orcamento_total,
            })
            .collect();

        let mut grouped: HashMap<ProjetoId, Vec<IrregularityFlag>> = HashMap::new();
        for flag in self.detector.detect(&inputs) {
            grouped.entry(flag.projeto_id).or_default().push(IrregularityFlag {
                tipo: flag.tipo,
                projeto_similar_id: flag.projeto_similar_id,
                similaridade: flag.similaridade,
            });
        }

        for projeto in projetos {
            let Some(flags) = grouped.remove(&projeto.id) else {
                continue;
            };
            let Some(resultado_id) = resultados.get(&projeto.id) else {
                continue;
            };
            let similaridade_maxima = flags
                .iter()
                .filter(|flag| flag.tipo == FlagKind::TextoSimilar)
                .map(|flag| flag.similaridade)
                .fold(0.0, f64::max);
            warn!(
                projeto_id = %projeto.id,
                flags = flags.len(),
                similaridade_maxima,
                "project flagged as possible duplicate"
            );
            self.repository
                .attach_flags(ctx.tenant_id, *resultado_id, flags, similaridade_maxima)
                .await?;
        }

        Ok(())
    }

    async fn analyse_habilitation(
        &self,
        projeto: &Projeto,
        documentos: &[Documento],
    ) -> HabilitationAnalysis {
        let prompt = habilitation_prompt(projeto, documentos);
        match self.ask(&prompt).await {
            Ok(raw) => decode_habilitation(&raw).unwrap_or_else(|err| {
                warn!(projeto_id = %projeto.id, error = %err, "habilitation answer unusable");
                HabilitationAnalysis::unavailable(err)
            }),
            Err(err) => {
                warn!(projeto_id = %projeto.id, error = %err, "habilitation analysis failed");
                HabilitationAnalysis::unavailable(err)
            }
        }
    }

    async fn suggest_scores(
        &self,
        projeto: &Projeto,
        criterios: &[Criterio],
    ) -> Vec<SuggestedScore> {
        if criterios.is_empty() {
            return Vec::new();
        }

        let prompt = scoring_prompt(projeto, criterios);
        let reason = match self.ask(&prompt).await {
            Ok(raw) => match decode_scores(&raw, criterios) {
                Ok(scores) => return scores,
                Err(err) => {
                    warn!(projeto_id = %projeto.id, error = %err, "scoring answer unusable");
                    format!("resposta da IA inválida: {err}")
                }
            },
            Err(err) => {
                warn!(projeto_id = %projeto.id, error = %err, "criterion scoring failed");
                format!("falha na chamada à IA: {err}")
            }
        };

        criterios
            .iter()
            .map(|criterio| SuggestedScore::fallback(criterio, &reason))
            .collect()
    }

    async fn ask(&self, prompt: &ChatPrompt) -> Result<String, ProviderError> {
        tokio::time::timeout(self.settings.call_timeout, self.model.complete_json(prompt))
            .await
            .map_err(|_| ProviderError::Timeout {
                secs: self.settings.call_timeout.as_secs(),
            })?
    }

    async fn load_edital(
        &self,
        ctx: &RequestContext,
        edital_id: EditalId,
    ) -> Result<Edital, TriageError> {
        self.repository
            .fetch_edital(ctx.tenant_id, edital_id)
            .await?
            .filter(|edital| edital.ativo)
            .ok_or(TriageError::EditalNotFound(edital_id))
    }
}

/// Error raised by the triage pipeline and its queries.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("edital {0} not found")]
    EditalNotFound(EditalId),
    #[error("triage run {0} not found")]
    ExecutionNotFound(ExecucaoId),
    #[error("edital {0} has no concluded triage run")]
    NoConcludedRun(EditalId),
    #[error("triage is limited to {limit} runs per hour")]
    RateLimited { limit: u32 },
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
