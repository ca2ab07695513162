use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DocumentoId, EditalId, ProjetoId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabilitationStatus {
    Pendente,
    Habilitado,
    Inabilitado,
}

impl HabilitationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pendente => "pendente",
            Self::Habilitado => "habilitado",
            Self::Inabilitado => "inabilitado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Pendente,
    Selecionado,
    Suplente,
    NaoSelecionado,
}

impl SelectionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pendente => "pendente",
            Self::Selecionado => "selecionado",
            Self::Suplente => "suplente",
            Self::NaoSelecionado => "nao_selecionado",
        }
    }
}

/// A proposal submitted to an edital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projeto {
    pub id: ProjetoId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub proponente_id: UserId,
    pub numero_protocolo: String,
    pub titulo: String,
    pub resumo: String,
    pub descricao_tecnica: String,
    pub orcamento_total: f64,
    pub cronograma_execucao: String,
    pub status_habilitacao: HabilitationStatus,
    pub motivo_habilitacao: Option<String>,
    pub nota_final: Option<f64>,
    pub status_selecao: SelectionStatus,
    pub criado_em: DateTime<Utc>,
}

/// Proponent supplied fields for a new submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub titulo: String,
    pub resumo: String,
    pub descricao_tecnica: String,
    pub orcamento_total: f64,
    #[serde(default)]
    pub cronograma_execucao: String,
}

/// Metadata of an uploaded attachment; the file itself lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documento {
    pub id: DocumentoId,
    pub tenant_id: TenantId,
    pub projeto_id: ProjetoId,
    pub nome_arquivo: String,
    pub tipo_mime: String,
    pub categoria: String,
    pub enviado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub nome_arquivo: String,
    pub tipo_mime: String,
    pub categoria: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabilitationDecision {
    Habilitado,
    Inabilitado,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub posicao: Option<u32>,
    pub projeto_id: ProjetoId,
    pub numero_protocolo: String,
    pub titulo: String,
    pub nota_final: Option<f64>,
    pub avaliacoes_finalizadas: u32,
    pub status_selecao: SelectionStatus,
}
