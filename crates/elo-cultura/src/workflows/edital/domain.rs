use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EditalId, TenantId};

/// The sixteen lifecycle stages of an edital, in the only order they may be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Criacao,
    Publicacao,
    Inscricao,
    InscricaoEncerrada,
    DivulgacaoInscritos,
    RecursoDivulgacaoInscritos,
    AvaliacaoTecnica,
    ResultadoPreliminarAvaliacao,
    RecursoAvaliacao,
    Habilitacao,
    ResultadoPreliminarHabilitacao,
    RecursoHabilitacao,
    ResultadoDefinitivoHabilitacao,
    ResultadoFinal,
    Homologacao,
    Arquivamento,
}

pub const PHASE_COUNT: usize = 16;

impl Phase {
    pub const fn ordered() -> [Self; PHASE_COUNT] {
        [
            Self::Criacao,
            Self::Publicacao,
            Self::Inscricao,
            Self::InscricaoEncerrada,
            Self::DivulgacaoInscritos,
            Self::RecursoDivulgacaoInscritos,
            Self::AvaliacaoTecnica,
            Self::ResultadoPreliminarAvaliacao,
            Self::RecursoAvaliacao,
            Self::Habilitacao,
            Self::ResultadoPreliminarHabilitacao,
            Self::RecursoHabilitacao,
            Self::ResultadoDefinitivoHabilitacao,
            Self::ResultadoFinal,
            Self::Homologacao,
            Self::Arquivamento,
        ]
    }

    pub fn index(self) -> usize {
        Self::ordered()
            .iter()
            .position(|phase| *phase == self)
            .unwrap_or(PHASE_COUNT - 1)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    /// The phase immediately after this one, or `None` at arquivamento.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Entering one of these phases notifies every proponent of the edital.
    pub const fn is_notifiable(self) -> bool {
        matches!(
            self,
            Self::Inscricao
                | Self::InscricaoEncerrada
                | Self::DivulgacaoInscritos
                | Self::ResultadoPreliminarAvaliacao
                | Self::ResultadoPreliminarHabilitacao
                | Self::ResultadoFinal
                | Self::Homologacao
        )
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Criacao => "criacao",
            Self::Publicacao => "publicacao",
            Self::Inscricao => "inscricao",
            Self::InscricaoEncerrada => "inscricao_encerrada",
            Self::DivulgacaoInscritos => "divulgacao_inscritos",
            Self::RecursoDivulgacaoInscritos => "recurso_divulgacao_inscritos",
            Self::AvaliacaoTecnica => "avaliacao_tecnica",
            Self::ResultadoPreliminarAvaliacao => "resultado_preliminar_avaliacao",
            Self::RecursoAvaliacao => "recurso_avaliacao",
            Self::Habilitacao => "habilitacao",
            Self::ResultadoPreliminarHabilitacao => "resultado_preliminar_habilitacao",
            Self::RecursoHabilitacao => "recurso_habilitacao",
            Self::ResultadoDefinitivoHabilitacao => "resultado_definitivo_habilitacao",
            Self::ResultadoFinal => "resultado_final",
            Self::Homologacao => "homologacao",
            Self::Arquivamento => "arquivamento",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Criacao => "Criação",
            Self::Publicacao => "Publicação",
            Self::Inscricao => "Inscrições abertas",
            Self::InscricaoEncerrada => "Inscrições encerradas",
            Self::DivulgacaoInscritos => "Divulgação dos inscritos",
            Self::RecursoDivulgacaoInscritos => "Recurso da lista de inscritos",
            Self::AvaliacaoTecnica => "Avaliação técnica",
            Self::ResultadoPreliminarAvaliacao => "Resultado preliminar da avaliação",
            Self::RecursoAvaliacao => "Recurso da avaliação",
            Self::Habilitacao => "Habilitação",
            Self::ResultadoPreliminarHabilitacao => "Resultado preliminar da habilitação",
            Self::RecursoHabilitacao => "Recurso da habilitação",
            Self::ResultadoDefinitivoHabilitacao => "Resultado definitivo da habilitação",
            Self::ResultadoFinal => "Resultado final",
            Self::Homologacao => "Homologação",
            Self::Arquivamento => "Arquivamento",
        }
    }

    pub const fn accepts_submissions(self) -> bool {
        matches!(self, Self::Inscricao)
    }

    pub const fn accepts_evaluations(self) -> bool {
        matches!(self, Self::AvaliacaoTecnica)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|phase| phase.code() == wanted)
            .ok_or_else(|| format!("unknown phase '{raw}'"))
    }
}

/// Opening and closing instants for a windowed phase (inscrição, recursos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub inicio: DateTime<Utc>,
    pub fim: DateTime<Utc>,
}

impl PhaseWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.inicio <= at && at <= self.fim
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edital {
    pub id: EditalId,
    pub tenant_id: TenantId,
    pub numero: String,
    pub titulo: String,
    pub descricao: String,
    pub status: Phase,
    #[serde(default)]
    pub janelas: BTreeMap<Phase, PhaseWindow>,
    pub vagas: u32,
    pub ativo: bool,
    /// Bumped on every status change; writers must present the version they read.
    pub version: u64,
    pub criado_em: DateTime<Utc>,
}

impl Edital {
    /// Whether `at` falls inside the configured window of `phase`; phases without a window are
    /// open for as long as the edital sits in them.
    pub fn window_open(&self, phase: Phase, at: DateTime<Utc>) -> bool {
        self.janelas
            .get(&phase)
            .map(|window| window.contains(at))
            .unwrap_or(true)
    }
}

/// Manager supplied fields for a new edital; it always starts at criacao.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdital {
    pub numero: String,
    pub titulo: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub janelas: BTreeMap<Phase, PhaseWindow>,
    #[serde(default)]
    pub vagas: u32,
}

/// Audit row for one visit to a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditalFase {
    pub edital_id: EditalId,
    pub fase: Phase,
    pub data_inicio: DateTime<Utc>,
    pub data_fim: Option<DateTime<Utc>>,
}

/// Atomic status change handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub tenant_id: TenantId,
    pub edital_id: EditalId,
    pub expected_version: u64,
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
}

/// Progress counters for the current phase. Informational only: advancing is never gated on
/// them, they exist so the manager decides with the numbers in view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCompleteness {
    pub total_projetos: u32,
    pub habilitacao_pendente: u32,
    pub habilitados: u32,
    pub inabilitados: u32,
    pub avaliacoes_atribuidas: u32,
    pub avaliacoes_finalizadas: u32,
    pub projetos_sem_avaliador: u32,
    pub recursos_abertos: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseAdvance {
    pub edital_id: EditalId,
    pub fase_anterior: Phase,
    pub fase: Phase,
    pub completude_anterior: PhaseCompleteness,
    pub notificacoes_enfileiradas: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn phases_form_a_total_order_of_sixteen() {
        let ordered = Phase::ordered();
        assert_eq!(ordered.len(), 16);
        assert_eq!(ordered[0], Phase::Criacao);
        assert_eq!(ordered[15], Phase::Arquivamento);
        for (index, phase) in ordered.iter().enumerate() {
            assert_eq!(phase.index(), index);
            assert_eq!(Phase::from_index(index), Some(*phase));
        }
        assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn only_arquivamento_is_terminal() {
        let terminal: Vec<_> = Phase::ordered()
            .into_iter()
            .filter(|phase| phase.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Phase::Arquivamento]);
        assert_eq!(Phase::Homologacao.next(), Some(Phase::Arquivamento));
    }

    #[test]
    fn notifiable_subset_matches_public_announcements() {
        let notifiable: Vec<_> = Phase::ordered()
            .into_iter()
            .filter(|phase| phase.is_notifiable())
            .map(Phase::code)
            .collect();
        assert_eq!(
            notifiable,
            vec![
                "inscricao",
                "inscricao_encerrada",
                "divulgacao_inscritos",
                "resultado_preliminar_avaliacao",
                "resultado_preliminar_habilitacao",
                "resultado_final",
                "homologacao",
            ]
        );
    }

    #[test]
    fn codes_round_trip_through_from_str_and_serde() {
        for phase in Phase::ordered() {
            assert_eq!(phase.code().parse::<Phase>(), Ok(phase));
            let json = serde_json::to_value(phase).expect("serialises");
            assert_eq!(json, serde_json::Value::String(phase.code().to_string()));
        }
        assert!("encerrado".parse::<Phase>().is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let inicio = Utc::now();
        let window = PhaseWindow {
            inicio,
            fim: inicio + Duration::days(10),
        };
        assert!(window.contains(inicio));
        assert!(window.contains(inicio + Duration::days(10)));
        assert!(!window.contains(inicio - Duration::seconds(1)));
    }
}
