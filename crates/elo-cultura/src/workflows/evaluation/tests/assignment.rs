use super::common::{evaluation_of, evaluator, matrix, pair, scores, service};
use crate::context::Role;
use crate::test_support::Fixture;
use crate::workflows::edital::Phase;
use crate::workflows::evaluation::{AssignmentError, AssignmentPair, AssignmentSummary};

#[tokio::test]
async fn save_applies_the_diff_against_stored_assignments() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let p1 = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let p2 = fixture.project(&edital, &maria, "Coco", "Roda de coco", 2_000.0).await;
    let a = evaluator(&fixture);
    let b = evaluator(&fixture);
    let matrix = matrix(&fixture);

    matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id), pair(&b, p2.id)])
        .await
        .expect("initial assignments saved");

    let summary = matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id), pair(&a, p2.id)])
        .await
        .expect("diff applied");

    assert_eq!(
        summary,
        AssignmentSummary {
            adicionadas: 1,
            removidas: 1
        }
    );
    let mut stored: Vec<AssignmentPair> = matrix
        .current(&fixture.gestor, edital.id)
        .await
        .expect("assignments load")
        .iter()
        .map(AssignmentPair::from)
        .collect();
    stored.sort();
    let mut expected = vec![pair(&a, p1.id), pair(&a, p2.id)];
    expected.sort();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn unchanged_pairs_keep_their_evaluation() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let p1 = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let a = evaluator(&fixture);
    let matrix = matrix(&fixture);

    matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id)])
        .await
        .expect("saved");
    let before = evaluation_of(&fixture, edital.id, &a).await;

    let summary = matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id), pair(&a, p1.id)])
        .await
        .expect("saved again");

    assert_eq!(summary.adicionadas, 0);
    assert_eq!(summary.removidas, 0);
    assert_eq!(evaluation_of(&fixture, edital.id, &a).await.id, before.id);
}

#[tokio::test]
async fn removing_a_finalized_evaluation_rejects_the_whole_save() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let criterios = fixture.criteria(&edital, &[2.0, 1.0, 1.0]).await;
    let maria = fixture.proponent("maria@example.org");
    let p1 = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let p2 = fixture.project(&edital, &maria, "Coco", "Roda de coco", 2_000.0).await;
    let a = evaluator(&fixture);
    let b = evaluator(&fixture);
    let matrix = matrix(&fixture);
    matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id), pair(&b, p2.id)])
        .await
        .expect("initial assignments saved");

    let finalized = evaluation_of(&fixture, edital.id, &b).await;
    let service = service(&fixture);
    service
        .save_scores(&b, finalized.id, scores(&criterios, &[8.0, 6.0, 10.0]), None)
        .await
        .expect("scores saved");
    service.finalize(&b, finalized.id).await.expect("finalized");

    let result = matrix
        .save(&fixture.gestor, edital.id, vec![pair(&a, p1.id), pair(&a, p2.id)])
        .await;

    match result {
        Err(AssignmentError::FinalizedEvaluation {
            avaliacao_id,
            avaliador_id,
            projeto_id,
        }) => {
            assert_eq!(avaliacao_id, finalized.id);
            assert_eq!(avaliador_id, b.actor_id);
            assert_eq!(projeto_id, p2.id);
        }
        other => panic!("expected finalized evaluation error, got {other:?}"),
    }

    let stored: Vec<AssignmentPair> = matrix
        .current(&fixture.gestor, edital.id)
        .await
        .expect("assignments load")
        .iter()
        .map(AssignmentPair::from)
        .collect();
    assert_eq!(stored.len(), 2);
    assert!(stored.contains(&pair(&b, p2.id)));
    assert!(!stored.contains(&pair(&a, p2.id)));
}

#[tokio::test]
async fn unknown_projects_are_rejected() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let other = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let foreign = fixture.project(&other, &maria, "Ciranda", "Roda", 1_000.0).await;
    let a = evaluator(&fixture);

    let result = matrix(&fixture)
        .save(&fixture.gestor, edital.id, vec![pair(&a, foreign.id)])
        .await;

    assert!(matches!(result, Err(AssignmentError::UnknownProject(id)) if id == foreign.id));
}

#[tokio::test]
async fn interleaved_saves_let_exactly_one_through() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let p1 = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let a = evaluator(&fixture);
    let b = evaluator(&fixture);
    let matrix = matrix(&fixture);

    let (first, second) = tokio::join!(
        matrix.save(&fixture.gestor, edital.id, vec![pair(&a, p1.id)]),
        matrix.save(&fixture.gestor, edital.id, vec![pair(&b, p1.id)])
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(AssignmentError::Conflict { .. })))
            .count(),
        1
    );
    let stored = matrix
        .current(&fixture.gestor, edital.id)
        .await
        .expect("assignments load");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn evaluators_cannot_edit_the_matrix() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::AvaliacaoTecnica, 2).await;

    let result = matrix(&fixture)
        .save(&fixture.actor(Role::Avaliador), edital.id, Vec::new())
        .await;

    assert!(matches!(result, Err(AssignmentError::Forbidden(_))));
}
