use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EditalId, PrestacaoId, ProjetoId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrestacaoStatus {
    Rascunho,
    Enviada,
    EmAnalise,
    Aprovada,
    Reprovada,
    ComPendencias,
}

impl PrestacaoStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rascunho => "rascunho",
            Self::Enviada => "enviada",
            Self::EmAnalise => "em_analise",
            Self::Aprovada => "aprovada",
            Self::Reprovada => "reprovada",
            Self::ComPendencias => "com_pendencias",
        }
    }

    /// The proponent may edit the report only before sending it or after pendencies are raised.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Rascunho | Self::ComPendencias)
    }

    pub fn can_become(self, next: Self) -> bool {
        match next {
            Self::Enviada => self.is_editable(),
            Self::EmAnalise => self == Self::Enviada,
            Self::Aprovada | Self::Reprovada | Self::ComPendencias => self == Self::EmAnalise,
            Self::Rascunho => false,
        }
    }
}

/// Accountability report for a selected project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestacaoContas {
    pub id: PrestacaoId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub projeto_id: ProjetoId,
    pub proponente_id: UserId,
    pub relatorio_atividades: String,
    pub valor_executado: f64,
    pub status: PrestacaoStatus,
    pub parecer: Option<String>,
    pub analisado_por: Option<UserId>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
    pub enviado_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountabilityDraft {
    pub relatorio_atividades: String,
    pub valor_executado: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Aprovada,
    Reprovada,
    ComPendencias,
}

impl From<ReviewDecision> for PrestacaoStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Aprovada => Self::Aprovada,
            ReviewDecision::Reprovada => Self::Reprovada,
            ReviewDecision::ComPendencias => Self::ComPendencias,
        }
    }
}
