use std::sync::Arc;

use axum::Router;

use crate::context::{RequestContext, Role};
use crate::store::MemoryStore;
use crate::test_support::Fixture;
use crate::workflows::evaluation::{
    evaluation_router, AssignmentMatrix, AssignmentPair, Avaliacao, CriterionScore, Criterio,
    EvaluationService, EvaluationState,
};

pub(super) fn matrix(fixture: &Fixture) -> AssignmentMatrix<MemoryStore> {
    AssignmentMatrix::new(fixture.store.clone())
}

pub(super) fn service(fixture: &Fixture) -> EvaluationService<MemoryStore> {
    EvaluationService::new(fixture.store.clone())
}

pub(super) fn router(fixture: &Fixture) -> Router {
    evaluation_router(EvaluationState {
        matrix: Arc::new(matrix(fixture)),
        service: Arc::new(service(fixture)),
    })
}

pub(super) fn evaluator(fixture: &Fixture) -> RequestContext {
    fixture.actor(Role::Avaliador)
}

pub(super) fn pair(
    avaliador: &RequestContext,
    projeto_id: crate::ids::ProjetoId,
) -> AssignmentPair {
    AssignmentPair {
        avaliador_id: avaliador.actor_id,
        projeto_id,
    }
}

pub(super) fn scores(criterios: &[Criterio], notas: &[f64]) -> Vec<CriterionScore> {
    criterios
        .iter()
        .zip(notas)
        .map(|(criterio, nota)| CriterionScore {
            criterio_id: criterio.id,
            nota: Some(*nota),
            comentario: None,
        })
        .collect()
}

/// The evaluation assigned to `avaliador`, looked up through the manager view.
pub(super) async fn evaluation_of(
    fixture: &Fixture,
    edital_id: crate::ids::EditalId,
    avaliador: &RequestContext,
) -> Avaliacao {
    matrix(fixture)
        .current(&fixture.gestor, edital_id)
        .await
        .expect("assignments load")
        .into_iter()
        .find(|avaliacao| avaliacao.avaliador_id == avaliador.actor_id)
        .expect("evaluator has an assignment")
}
