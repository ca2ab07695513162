use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CriterioId, EditalId, ExecucaoId, ProjetoId, ResultadoId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    EmAndamento,
    Concluida,
    Erro,
}

impl ExecutionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::EmAndamento => "em_andamento",
            Self::Concluida => "concluida",
            Self::Erro => "erro",
        }
    }
}

/// One triage run over every project of an edital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriagemExecucao {
    pub id: ExecucaoId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub status: ExecutionStatus,
    pub total_projetos: u32,
    pub projetos_analisados: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erro_mensagem: Option<String>,
    pub iniciado_por: UserId,
    pub iniciado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
    pub finalizado_em: Option<DateTime<Utc>>,
}

impl TriagemExecucao {
    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::EmAndamento
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabilitationSuggestion {
    Habilitado,
    Inabilitado,
    Pendencia,
}

impl HabilitationSuggestion {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "habilitado" => Some(Self::Habilitado),
            "inabilitado" => Some(Self::Inabilitado),
            "pendencia" | "pendência" => Some(Self::Pendencia),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    TextoSimilar,
    OrcamentoDuplicado,
}

/// A suspicion raised against a project because another project of the edital resembles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrregularityFlag {
    pub tipo: FlagKind,
    pub projeto_similar_id: ProjetoId,
    pub similaridade: f64,
}

/// Per-project AI output. Written once per run and never merged into a later run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriagemResultado {
    pub id: ResultadoId,
    pub tenant_id: TenantId,
    pub execucao_id: ExecucaoId,
    pub projeto_id: ProjetoId,
    pub sugestao_habilitacao: HabilitationSuggestion,
    pub motivo_habilitacao: String,
    pub docs_completos: bool,
    pub problemas_documentos: Vec<String>,
    pub nota_agregada: f64,
    pub irregularidades: Vec<IrregularityFlag>,
    pub similaridade_maxima: f64,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriagemNota {
    pub resultado_id: ResultadoId,
    pub criterio_id: CriterioId,
    pub nota_sugerida: f64,
    pub justificativa: String,
    pub confianca: f64,
}

/// A result with its criterion notes, as served to managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResultDetail {
    pub resultado: TriagemResultado,
    pub notas: Vec<TriagemNota>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub execucao: TriagemExecucao,
    pub resultados: Vec<TriageResultDetail>,
}
