use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::ids::{
    AvaliacaoId, EditalId, ExecucaoId, PrestacaoId, ProjetoId, RecursoId, ResultadoId, TenantId,
    UserId,
};
use crate::notifications::{Contact, DirectoryRepository};
use crate::workflows::accountability::{
    AccountabilityRepository, PrestacaoContas, PrestacaoStatus,
};
use crate::workflows::appeals::{AppealRepository, Recurso, RecursoStatus};
use crate::workflows::edital::{
    Edital, EditalFase, EditalRepository, PhaseCompleteness, PhaseTransition,
};
use crate::workflows::evaluation::{
    AssignmentChange, AssignmentSnapshot, Avaliacao, AvaliacaoCriterio, Criterio,
    EvaluationRepository, EvaluationStatus,
};
use crate::workflows::projects::{Documento, HabilitationStatus, ProjectRepository, Projeto};
use crate::workflows::triage::{
    ExecutionStatus, IrregularityFlag, TriageRepository, TriageResultDetail, TriagemExecucao,
    TriagemNota, TriagemResultado,
};

/// Repository calls that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    FetchEdital,
    TransitionPhase,
    ProjectsForEdital,
    DocumentsForProject,
    InsertResult,
    RecordProgress,
    ContactLookup,
}

#[derive(Default)]
struct State {
    editais: HashMap<EditalId, Edital>,
    fases: Vec<EditalFase>,
    projetos: Vec<Projeto>,
    documentos: Vec<Documento>,
    criterios: HashMap<EditalId, Vec<Criterio>>,
    avaliacoes: Vec<Avaliacao>,
    assignment_versions: HashMap<EditalId, u64>,
    notas: HashMap<AvaliacaoId, Vec<AvaliacaoCriterio>>,
    execucoes: Vec<TriagemExecucao>,
    resultados: Vec<TriagemResultado>,
    triagem_notas: HashMap<ResultadoId, Vec<TriagemNota>>,
    recursos: Vec<Recurso>,
    prestacoes: Vec<PrestacaoContas>,
    contatos: HashMap<(TenantId, UserId), Contact>,
}

/// Single-process backend implementing every repository trait.
///
/// Each call takes the lock once, so every trait method is atomic. Reads that precede an
/// optimistic write (`fetch_edital`, `assignments_for_edital`) yield to the scheduler after
/// reading, so interleaved callers observe the same version the way they would against a
/// remote database.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failures: Mutex<HashSet<FailurePoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call through `point` fail with [`RepositoryError::Unavailable`].
    pub fn fail_on(&self, point: FailurePoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(point);
        }
    }

    pub fn clear_failure(&self, point: FailurePoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(&point);
        }
    }

    pub fn register_contact(&self, tenant_id: TenantId, contact: Contact) {
        if let Ok(mut state) = self.state.lock() {
            state.contatos.insert((tenant_id, contact.user_id), contact);
        }
    }

    fn check(&self, point: FailurePoint) -> Result<(), RepositoryError> {
        let failures = self
            .failures
            .lock()
            .map_err(|_| RepositoryError::Unavailable("failure registry poisoned".to_string()))?;
        if failures.contains(&point) {
            Err(RepositoryError::Unavailable(format!(
                "injected failure at {point:?}"
            )))
        } else {
            Ok(())
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl EditalRepository for MemoryStore {
    async fn insert_edital(&self, edital: Edital) -> Result<Edital, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state
            .editais
            .values()
            .any(|existing| {
                existing.tenant_id == edital.tenant_id && existing.numero == edital.numero
            });
        if duplicate || state.editais.contains_key(&edital.id) {
            return Err(RepositoryError::Conflict);
        }
        state.fases.push(EditalFase {
            edital_id: edital.id,
            fase: edital.status,
            data_inicio: edital.criado_em,
            data_fim: None,
        });
        state.editais.insert(edital.id, edital.clone());
        Ok(edital)
    }

    async fn fetch_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Option<Edital>, RepositoryError> {
        self.check(FailurePoint::FetchEdital)?;
        let edital = {
            let state = self.state()?;
            state
                .editais
                .get(&edital_id)
                .filter(|edital| edital.tenant_id == tenant_id)
                .cloned()
        };
        tokio::task::yield_now().await;
        Ok(edital)
    }

    async fn transition_phase(
        &self,
        transition: PhaseTransition,
    ) -> Result<Edital, RepositoryError> {
        self.check(FailurePoint::TransitionPhase)?;
        let mut state = self.state()?;
        let edital = state
            .editais
            .get_mut(&transition.edital_id)
            .filter(|edital| edital.tenant_id == transition.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        if edital.version != transition.expected_version || edital.status != transition.from {
            return Err(RepositoryError::Conflict);
        }
        edital.status = transition.to;
        edital.version += 1;
        let updated = edital.clone();

        for fase in state
            .fases
            .iter_mut()
            .filter(|fase| fase.edital_id == transition.edital_id && fase.data_fim.is_none())
        {
            fase.data_fim = Some(transition.at);
        }
        state.fases.push(EditalFase {
            edital_id: transition.edital_id,
            fase: transition.to,
            data_inicio: transition.at,
            data_fim: None,
        });

        Ok(updated)
    }

    async fn phase_history(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<EditalFase>, RepositoryError> {
        let state = self.state()?;
        if !owns_edital(&state, tenant_id, edital_id) {
            return Ok(Vec::new());
        }
        Ok(state
            .fases
            .iter()
            .filter(|fase| fase.edital_id == edital_id)
            .cloned()
            .collect())
    }

    async fn completeness(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<PhaseCompleteness, RepositoryError> {
        let state = self.state()?;
        let mut stats = PhaseCompleteness::default();
        if !owns_edital(&state, tenant_id, edital_id) {
            return Ok(stats);
        }

        let avaliacoes: Vec<&Avaliacao> = state
            .avaliacoes
            .iter()
            .filter(|avaliacao| avaliacao.edital_id == edital_id)
            .collect();

        for projeto in state
            .projetos
            .iter()
            .filter(|projeto| projeto.edital_id == edital_id)
        {
            stats.total_projetos += 1;
            match projeto.status_habilitacao {
                HabilitationStatus::Pendente => stats.habilitacao_pendente += 1,
                HabilitationStatus::Habilitado => stats.habilitados += 1,
                HabilitationStatus::Inabilitado => stats.inabilitados += 1,
            }
            if !avaliacoes
                .iter()
                .any(|avaliacao| avaliacao.projeto_id == projeto.id)
            {
                stats.projetos_sem_avaliador += 1;
            }
        }

        stats.avaliacoes_atribuidas = avaliacoes.len() as u32;
        stats.avaliacoes_finalizadas = avaliacoes
            .iter()
            .filter(|avaliacao| avaliacao.is_finalized())
            .count() as u32;
        stats.recursos_abertos = state
            .recursos
            .iter()
            .filter(|recurso| recurso.edital_id == edital_id && recurso.status.is_open())
            .count() as u32;

        Ok(stats)
    }
}

fn owns_edital(state: &State, tenant_id: TenantId, edital_id: EditalId) -> bool {
    state
        .editais
        .get(&edital_id)
        .is_some_and(|edital| edital.tenant_id == tenant_id)
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn insert_project(&self, projeto: Projeto) -> Result<Projeto, RepositoryError> {
        let mut state = self.state()?;
        if state.projetos.iter().any(|existing| {
            existing.id == projeto.id || existing.numero_protocolo == projeto.numero_protocolo
        }) {
            return Err(RepositoryError::Conflict);
        }
        state.projetos.push(projeto.clone());
        Ok(projeto)
    }

    async fn update_project(&self, projeto: Projeto) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .projetos
            .iter_mut()
            .find(|existing| existing.id == projeto.id && existing.tenant_id == projeto.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = projeto;
        Ok(())
    }

    async fn fetch_project(
        &self,
        tenant_id: TenantId,
        projeto_id: ProjetoId,
    ) -> Result<Option<Projeto>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .projetos
            .iter()
            .find(|projeto| projeto.id == projeto_id && projeto.tenant_id == tenant_id)
            .cloned())
    }

    async fn projects_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Projeto>, RepositoryError> {
        self.check(FailurePoint::ProjectsForEdital)?;
        let state = self.state()?;
        let mut projetos: Vec<Projeto> = state
            .projetos
            .iter()
            .filter(|projeto| projeto.tenant_id == tenant_id && projeto.edital_id == edital_id)
            .cloned()
            .collect();
        projetos.sort_by(|left, right| {
            left.criado_em
                .cmp(&right.criado_em)
                .then_with(|| left.numero_protocolo.cmp(&right.numero_protocolo))
        });
        Ok(projetos)
    }

    async fn insert_document(&self, documento: Documento) -> Result<Documento, RepositoryError> {
        let mut state = self.state()?;
        if !state.projetos.iter().any(|projeto| {
            projeto.id == documento.projeto_id && projeto.tenant_id == documento.tenant_id
        }) {
            return Err(RepositoryError::NotFound);
        }
        state.documentos.push(documento.clone());
        Ok(documento)
    }

    async fn documents_for_project(
        &self,
        tenant_id: TenantId,
        projeto_id: ProjetoId,
    ) -> Result<Vec<Documento>, RepositoryError> {
        self.check(FailurePoint::DocumentsForProject)?;
        let state = self.state()?;
        Ok(state
            .documentos
            .iter()
            .filter(|documento| {
                documento.tenant_id == tenant_id && documento.projeto_id == projeto_id
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EvaluationRepository for MemoryStore {
    async fn criteria_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Criterio>, RepositoryError> {
        let state = self.state()?;
        let mut criterios: Vec<Criterio> = state
            .criterios
            .get(&edital_id)
            .map(|criterios| {
                criterios
                    .iter()
                    .filter(|criterio| criterio.tenant_id == tenant_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        criterios.sort_by_key(|criterio| criterio.ordem);
        Ok(criterios)
    }

    async fn replace_criteria(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
        criterios: Vec<Criterio>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !owns_edital(&state, tenant_id, edital_id) {
            return Err(RepositoryError::NotFound);
        }
        state.criterios.insert(edital_id, criterios);
        Ok(())
    }

    async fn assignments_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<AssignmentSnapshot, RepositoryError> {
        let snapshot = {
            let state = self.state()?;
            AssignmentSnapshot {
                version: state
                    .assignment_versions
                    .get(&edital_id)
                    .copied()
                    .unwrap_or_default(),
                avaliacoes: state
                    .avaliacoes
                    .iter()
                    .filter(|avaliacao| {
                        avaliacao.tenant_id == tenant_id && avaliacao.edital_id == edital_id
                    })
                    .cloned()
                    .collect(),
            }
        };
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn apply_assignments(&self, change: AssignmentChange) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let version = state
            .assignment_versions
            .get(&change.edital_id)
            .copied()
            .unwrap_or_default();
        if version != change.expected_version {
            return Err(RepositoryError::Conflict);
        }

        let removals: HashSet<AvaliacaoId> = change.remove.iter().copied().collect();
        for avaliacao_id in &removals {
            let stored = state
                .avaliacoes
                .iter()
                .find(|avaliacao| {
                    avaliacao.id == *avaliacao_id && avaliacao.tenant_id == change.tenant_id
                })
                .ok_or(RepositoryError::Conflict)?;
            if stored.is_finalized() {
                return Err(RepositoryError::Conflict);
            }
        }

        state
            .avaliacoes
            .retain(|avaliacao| !removals.contains(&avaliacao.id));
        for avaliacao_id in &removals {
            state.notas.remove(avaliacao_id);
        }
        state.avaliacoes.extend(change.insert);
        state
            .assignment_versions
            .insert(change.edital_id, version + 1);
        Ok(())
    }

    async fn fetch_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Option<Avaliacao>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .avaliacoes
            .iter()
            .find(|avaliacao| avaliacao.id == avaliacao_id && avaliacao.tenant_id == tenant_id)
            .cloned())
    }

    async fn scores_for_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
    ) -> Result<Vec<AvaliacaoCriterio>, RepositoryError> {
        let state = self.state()?;
        if !state
            .avaliacoes
            .iter()
            .any(|avaliacao| avaliacao.id == avaliacao_id && avaliacao.tenant_id == tenant_id)
        {
            return Ok(Vec::new());
        }
        Ok(state.notas.get(&avaliacao_id).cloned().unwrap_or_default())
    }

    async fn replace_scores(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
        justificativa: Option<String>,
        scores: Vec<AvaliacaoCriterio>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let avaliacao = state
            .avaliacoes
            .iter_mut()
            .find(|avaliacao| avaliacao.id == avaliacao_id && avaliacao.tenant_id == tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        if avaliacao.is_finalized() {
            return Err(RepositoryError::Conflict);
        }
        avaliacao.justificativa = justificativa;
        state.notas.insert(avaliacao_id, scores);
        Ok(())
    }

    async fn finalize_evaluation(
        &self,
        tenant_id: TenantId,
        avaliacao_id: AvaliacaoId,
        nota_total: f64,
        at: DateTime<Utc>,
    ) -> Result<Avaliacao, RepositoryError> {
        let mut state = self.state()?;
        let avaliacao = state
            .avaliacoes
            .iter_mut()
            .find(|avaliacao| avaliacao.id == avaliacao_id && avaliacao.tenant_id == tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        if avaliacao.is_finalized() {
            return Err(RepositoryError::Conflict);
        }
        avaliacao.status = EvaluationStatus::Finalizada;
        avaliacao.nota_total = Some(nota_total);
        avaliacao.finalizado_em = Some(at);
        Ok(avaliacao.clone())
    }

    async fn edital_has_scores(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .avaliacoes
            .iter()
            .filter(|avaliacao| {
                avaliacao.tenant_id == tenant_id && avaliacao.edital_id == edital_id
            })
            .any(|avaliacao| {
                state
                    .notas
                    .get(&avaliacao.id)
                    .is_some_and(|notas| !notas.is_empty())
            }))
    }
}

#[async_trait]
impl TriageRepository for MemoryStore {
    async fn insert_execution(
        &self,
        execucao: TriagemExecucao,
    ) -> Result<TriagemExecucao, RepositoryError> {
        let mut state = self.state()?;
        if state.execucoes.iter().any(|existing| existing.id == execucao.id) {
            return Err(RepositoryError::Conflict);
        }
        state.execucoes.push(execucao.clone());
        Ok(execucao)
    }

    async fn fetch_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
    ) -> Result<Option<TriagemExecucao>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .execucoes
            .iter()
            .find(|execucao| execucao.id == execucao_id && execucao.tenant_id == tenant_id)
            .cloned())
    }

    async fn rescope_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        total_projetos: u32,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let execucao = find_execution(&mut state, tenant_id, execucao_id)?;
        if !execucao.is_running() {
            return Err(RepositoryError::Conflict);
        }
        execucao.total_projetos = total_projetos;
        execucao.atualizado_em = at;
        Ok(())
    }

    async fn record_progress(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        projetos_analisados: u32,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check(FailurePoint::RecordProgress)?;
        let mut state = self.state()?;
        let execucao = find_execution(&mut state, tenant_id, execucao_id)?;
        if !execucao.is_running() {
            return Err(RepositoryError::Conflict);
        }
        execucao.projetos_analisados = projetos_analisados;
        execucao.atualizado_em = at;
        Ok(())
    }

    async fn finish_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
        status: ExecutionStatus,
        erro_mensagem: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<TriagemExecucao, RepositoryError> {
        let mut state = self.state()?;
        let execucao = find_execution(&mut state, tenant_id, execucao_id)?;
        if !execucao.is_running() {
            return Err(RepositoryError::Conflict);
        }
        execucao.status = status;
        execucao.erro_mensagem = erro_mensagem;
        execucao.atualizado_em = at;
        execucao.finalizado_em = Some(at);
        Ok(execucao.clone())
    }

    async fn running_executions(&self) -> Result<Vec<TriagemExecucao>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .execucoes
            .iter()
            .filter(|execucao| execucao.is_running())
            .cloned()
            .collect())
    }

    async fn latest_concluded(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Option<TriagemExecucao>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .execucoes
            .iter()
            .filter(|execucao| {
                execucao.tenant_id == tenant_id
                    && execucao.edital_id == edital_id
                    && execucao.status == ExecutionStatus::Concluida
            })
            .max_by_key(|execucao| execucao.iniciado_em)
            .cloned())
    }

    async fn insert_result(
        &self,
        resultado: TriagemResultado,
        notas: Vec<TriagemNota>,
    ) -> Result<(), RepositoryError> {
        self.check(FailurePoint::InsertResult)?;
        let mut state = self.state()?;
        state.triagem_notas.insert(resultado.id, notas);
        state.resultados.push(resultado);
        Ok(())
    }

    async fn attach_flags(
        &self,
        tenant_id: TenantId,
        resultado_id: ResultadoId,
        flags: Vec<IrregularityFlag>,
        similaridade_maxima: f64,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let resultado = state
            .resultados
            .iter_mut()
            .find(|resultado| resultado.id == resultado_id && resultado.tenant_id == tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        resultado.irregularidades = flags;
        resultado.similaridade_maxima = similaridade_maxima;
        Ok(())
    }

    async fn results_for_execution(
        &self,
        tenant_id: TenantId,
        execucao_id: ExecucaoId,
    ) -> Result<Vec<TriageResultDetail>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .resultados
            .iter()
            .filter(|resultado| {
                resultado.tenant_id == tenant_id && resultado.execucao_id == execucao_id
            })
            .map(|resultado| TriageResultDetail {
                resultado: resultado.clone(),
                notas: state
                    .triagem_notas
                    .get(&resultado.id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn find_execution<'a>(
    state: &'a mut State,
    tenant_id: TenantId,
    execucao_id: ExecucaoId,
) -> Result<&'a mut TriagemExecucao, RepositoryError> {
    state
        .execucoes
        .iter_mut()
        .find(|execucao| execucao.id == execucao_id && execucao.tenant_id == tenant_id)
        .ok_or(RepositoryError::NotFound)
}

#[async_trait]
impl AppealRepository for MemoryStore {
    async fn insert_recurso(&self, recurso: Recurso) -> Result<Recurso, RepositoryError> {
        let mut state = self.state()?;
        let open_duplicate = state.recursos.iter().any(|existing| {
            existing.projeto_id == recurso.projeto_id
                && existing.tipo == recurso.tipo
                && existing.status.is_open()
        });
        if open_duplicate {
            return Err(RepositoryError::Conflict);
        }
        state.recursos.push(recurso.clone());
        Ok(recurso)
    }

    async fn fetch_recurso(
        &self,
        tenant_id: TenantId,
        recurso_id: RecursoId,
    ) -> Result<Option<Recurso>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .recursos
            .iter()
            .find(|recurso| recurso.id == recurso_id && recurso.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_recurso(
        &self,
        recurso: Recurso,
        expected: RecursoStatus,
    ) -> Result<Recurso, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .recursos
            .iter_mut()
            .find(|existing| existing.id == recurso.id && existing.tenant_id == recurso.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict);
        }
        *stored = recurso.clone();
        Ok(recurso)
    }

    async fn recursos_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Recurso>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .recursos
            .iter()
            .filter(|recurso| recurso.tenant_id == tenant_id && recurso.edital_id == edital_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountabilityRepository for MemoryStore {
    async fn insert_prestacao(
        &self,
        prestacao: PrestacaoContas,
    ) -> Result<PrestacaoContas, RepositoryError> {
        let mut state = self.state()?;
        if state
            .prestacoes
            .iter()
            .any(|existing| existing.projeto_id == prestacao.projeto_id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.prestacoes.push(prestacao.clone());
        Ok(prestacao)
    }

    async fn fetch_prestacao(
        &self,
        tenant_id: TenantId,
        prestacao_id: PrestacaoId,
    ) -> Result<Option<PrestacaoContas>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .prestacoes
            .iter()
            .find(|prestacao| prestacao.id == prestacao_id && prestacao.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_prestacao(
        &self,
        prestacao: PrestacaoContas,
        expected: PrestacaoStatus,
    ) -> Result<PrestacaoContas, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .prestacoes
            .iter_mut()
            .find(|existing| {
                existing.id == prestacao.id && existing.tenant_id == prestacao.tenant_id
            })
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict);
        }
        *stored = prestacao.clone();
        Ok(prestacao)
    }

    async fn prestacoes_for_edital(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<PrestacaoContas>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .prestacoes
            .iter()
            .filter(|prestacao| {
                prestacao.tenant_id == tenant_id && prestacao.edital_id == edital_id
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DirectoryRepository for MemoryStore {
    async fn contact(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Contact>, RepositoryError> {
        self.check(FailurePoint::ContactLookup)?;
        let state = self.state()?;
        Ok(state.contatos.get(&(tenant_id, user_id)).cloned())
    }

    async fn proponent_contacts(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Contact>, RepositoryError> {
        self.check(FailurePoint::ContactLookup)?;
        let state = self.state()?;
        let mut seen = HashSet::new();
        Ok(state
            .projetos
            .iter()
            .filter(|projeto| projeto.tenant_id == tenant_id && projeto.edital_id == edital_id)
            .filter(|projeto| seen.insert(projeto.proponente_id))
            .filter_map(|projeto| state.contatos.get(&(tenant_id, projeto.proponente_id)).cloned())
            .collect())
    }
}
