use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AvaliacaoId, CriterioId, EditalId, ProjetoId, TenantId, UserId};

/// One rubric line of an edital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterio {
    pub id: CriterioId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub descricao: String,
    pub nota_minima: f64,
    pub nota_maxima: f64,
    pub peso: f64,
    pub ordem: u32,
}

impl Criterio {
    pub fn midpoint(&self) -> f64 {
        (self.nota_minima + self.nota_maxima) / 2.0
    }

    pub fn clamp(&self, nota: f64) -> f64 {
        nota.clamp(self.nota_minima, self.nota_maxima)
    }

    pub fn accepts(&self, nota: f64) -> bool {
        nota.is_finite() && nota >= self.nota_minima && nota <= self.nota_maxima
    }
}

/// Editor input for [`Criterio`] bulk replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCriterio {
    pub descricao: String,
    pub nota_minima: f64,
    pub nota_maxima: f64,
    #[serde(default = "default_weight")]
    pub peso: f64,
    #[serde(default)]
    pub ordem: u32,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    EmAndamento,
    Finalizada,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::EmAndamento => "em_andamento",
            Self::Finalizada => "finalizada",
        }
    }
}

/// One evaluator assigned to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avaliacao {
    pub id: AvaliacaoId,
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub projeto_id: ProjetoId,
    pub avaliador_id: UserId,
    pub status: EvaluationStatus,
    pub justificativa: Option<String>,
    pub nota_total: Option<f64>,
    pub criado_em: DateTime<Utc>,
    pub finalizado_em: Option<DateTime<Utc>>,
}

impl Avaliacao {
    pub fn is_finalized(&self) -> bool {
        self.status == EvaluationStatus::Finalizada
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvaliacaoCriterio {
    pub avaliacao_id: AvaliacaoId,
    pub criterio_id: CriterioId,
    pub nota: f64,
    pub comentario: Option<String>,
}

/// Evaluator input for one criterion; `nota: None` leaves the criterion unscored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterio_id: CriterioId,
    pub nota: Option<f64>,
    #[serde(default)]
    pub comentario: Option<String>,
}
