use chrono::Utc;

use crate::context::{RequestContext, Role};
use crate::ids::{AvaliacaoId, EditalId};
use crate::store::MemoryStore;
use crate::test_support::Fixture;
use crate::workflows::evaluation::{
    AssignmentChange, Avaliacao, EvaluationRepository, EvaluationStatus,
};
use crate::workflows::projects::{ProjectDraft, ProjectService, Projeto};

pub(super) fn service(fixture: &Fixture) -> ProjectService<MemoryStore> {
    ProjectService::new(fixture.store.clone(), fixture.notifier.clone())
}

pub(super) fn draft(titulo: &str, orcamento: f64) -> ProjectDraft {
    ProjectDraft {
        titulo: titulo.to_string(),
        resumo: format!("Resumo de {titulo}"),
        descricao_tecnica: "Atividades formativas abertas ao público".to_string(),
        orcamento_total: orcamento,
        cronograma_execucao: "Abril a julho".to_string(),
    }
}

/// Stores one finalized evaluation per total for each listed project.
pub(super) async fn finalized_totals(
    fixture: &Fixture,
    edital_id: EditalId,
    totals: &[(&Projeto, Vec<f64>)],
) {
    let now = Utc::now();
    let insert = totals
        .iter()
        .flat_map(|(projeto, notas)| {
            notas.iter().map(move |nota| Avaliacao {
                id: AvaliacaoId::new(),
                tenant_id: fixture.tenant_id,
                edital_id,
                projeto_id: projeto.id,
                avaliador_id: fixture.actor(Role::Avaliador).actor_id,
                status: EvaluationStatus::Finalizada,
                justificativa: None,
                nota_total: Some(*nota),
                criado_em: now,
                finalizado_em: Some(now),
            })
        })
        .collect();
    fixture
        .store
        .apply_assignments(AssignmentChange {
            tenant_id: fixture.tenant_id,
            edital_id,
            expected_version: 0,
            insert,
            remove: Vec::new(),
        })
        .await
        .expect("evaluations stored");
}

pub(super) fn outsider(fixture: &Fixture) -> RequestContext {
    fixture.actor(Role::Proponente)
}
