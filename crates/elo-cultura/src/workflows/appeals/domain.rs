use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EditalId, ProjetoId, RecursoId, TenantId, UserId};
use crate::workflows::edital::Phase;

/// Which decision an appeal contests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecursoTipo {
    Inscricao,
    Avaliacao,
    Habilitacao,
}

impl RecursoTipo {
    /// The only phase in which this kind of appeal may be filed.
    pub const fn phase(self) -> Phase {
        match self {
            Self::Inscricao => Phase::RecursoDivulgacaoInscritos,
            Self::Avaliacao => Phase::RecursoAvaliacao,
            Self::Habilitacao => Phase::RecursoHabilitacao,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Inscricao => "inscricao",
            Self::Avaliacao => "avaliacao",
            Self::Habilitacao => "habilitacao",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecursoStatus {
    Pendente,
    EmAnalise,
    Deferido,
    Indeferido,
}

impl RecursoStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pendente => "pendente",
            Self::EmAnalise => "em_analise",
            Self::Deferido => "deferido",
            Self::Indeferido => "indeferido",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pendente | Self::EmAnalise)
    }

    pub fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pendente, Self::EmAnalise)
                | (Self::EmAnalise, Self::Deferido)
                | (Self::EmAnalise, Self::Indeferido)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurso {
    pub id: RecursoId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub projeto_id: ProjetoId,
    pub proponente_id: UserId,
    pub tipo: RecursoTipo,
    pub fundamentacao: String,
    pub status: RecursoStatus,
    pub resposta: Option<String>,
    pub decidido_por: Option<UserId>,
    pub criado_em: DateTime<Utc>,
    pub decidido_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecurso {
    pub projeto_id: ProjetoId,
    pub tipo: RecursoTipo,
    pub fundamentacao: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealDecision {
    Deferido,
    Indeferido,
}

impl From<AppealDecision> for RecursoStatus {
    fn from(decision: AppealDecision) -> Self {
        match decision {
            AppealDecision::Deferido => Self::Deferido,
            AppealDecision::Indeferido => Self::Indeferido,
        }
    }
}
