use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};

use super::common::{draft, finalized_totals, outsider, service};
use crate::context::Role;
use crate::ids::EditalId;
use crate::test_support::Fixture;
use crate::workflows::edital::{Edital, EditalRepository, Phase, PhaseWindow};
use crate::workflows::projects::{
    protocol_number, HabilitationDecision, HabilitationStatus, NewDocument, ProjectError,
    SelectionStatus,
};

#[test]
fn protocol_numbers_embed_the_submission_instant() {
    let at = Utc
        .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
        .single()
        .expect("valid instant");

    let protocolo = protocol_number(at);

    assert!(protocolo.starts_with("EC-20250314092653-"));
    let suffix = &protocolo["EC-20250314092653-".len()..];
    assert_eq!(suffix.len(), 4);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
}

#[tokio::test]
async fn proponents_submit_while_inscricao_is_open() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Inscricao, 2).await;
    let maria = fixture.proponent("maria@example.org");

    let projeto = service(&fixture)
        .submit(&maria, edital.id, draft("  Ciranda na Praça ", 12_500.0))
        .await
        .expect("submitted");

    assert_eq!(projeto.titulo, "Ciranda na Praça");
    assert_eq!(projeto.proponente_id, maria.actor_id);
    assert_eq!(projeto.status_habilitacao, HabilitationStatus::Pendente);
    assert_eq!(projeto.status_selecao, SelectionStatus::Pendente);
    assert!(projeto.numero_protocolo.starts_with("EC-"));
}

#[tokio::test]
async fn submissions_outside_inscricao_are_rejected() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::InscricaoEncerrada, 2).await;
    let maria = fixture.proponent("maria@example.org");

    let result = service(&fixture)
        .submit(&maria, edital.id, draft("Ciranda", 1_000.0))
        .await;

    assert!(matches!(
        result,
        Err(ProjectError::WrongPhase {
            fase: Phase::InscricaoEncerrada
        })
    ));
}

#[tokio::test]
async fn submissions_after_the_window_closes_are_rejected() {
    let fixture = Fixture::new();
    let now = Utc::now();
    let mut janelas = BTreeMap::new();
    janelas.insert(
        Phase::Inscricao,
        PhaseWindow {
            inicio: now - Duration::days(10),
            fim: now - Duration::days(1),
        },
    );
    let edital = fixture
        .store
        .insert_edital(Edital {
            id: EditalId::new(),
            tenant_id: fixture.tenant_id,
            numero: "031/2025".to_string(),
            titulo: "Edital de Música".to_string(),
            descricao: String::new(),
            status: Phase::Inscricao,
            janelas,
            vagas: 2,
            ativo: true,
            version: 0,
            criado_em: now,
        })
        .await
        .expect("edital stored");
    let maria = fixture.proponent("maria@example.org");

    let result = service(&fixture)
        .submit(&maria, edital.id, draft("Ciranda", 1_000.0))
        .await;

    assert!(matches!(result, Err(ProjectError::WindowClosed { .. })));
}

#[tokio::test]
async fn invalid_drafts_and_non_proponents_are_rejected() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Inscricao, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let service = service(&fixture);

    let blank = service.submit(&maria, edital.id, draft("   ", 1_000.0)).await;
    assert!(matches!(blank, Err(ProjectError::Invalid(_))));

    let negative = service.submit(&maria, edital.id, draft("Coco", -1.0)).await;
    assert!(matches!(negative, Err(ProjectError::Invalid(_))));

    let manager = service
        .submit(&fixture.gestor, edital.id, draft("Coco", 1_000.0))
        .await;
    assert!(matches!(manager, Err(ProjectError::Forbidden(_))));
}

#[tokio::test]
async fn proponents_only_see_their_own_projects() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Inscricao, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let joao = fixture.proponent("joao@example.org");
    let service = service(&fixture);
    let own = service
        .submit(&maria, edital.id, draft("Ciranda", 1_000.0))
        .await
        .expect("submitted");
    service
        .submit(&joao, edital.id, draft("Sarau", 2_000.0))
        .await
        .expect("submitted");

    let listed = service.list(&maria, edital.id).await.expect("listed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, own.id);
    assert_eq!(
        service.list(&fixture.gestor, edital.id).await.expect("listed").len(),
        2
    );

    let peek = service.get(&joao, own.id).await;
    assert!(matches!(peek, Err(ProjectError::ProjectNotFound(id)) if id == own.id));
}

#[tokio::test]
async fn documents_attach_to_the_owners_project() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Inscricao, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let service = service(&fixture);
    let projeto = service
        .submit(&maria, edital.id, draft("Ciranda", 1_000.0))
        .await
        .expect("submitted");

    service
        .attach_document(
            &maria,
            projeto.id,
            NewDocument {
                nome_arquivo: "rg.pdf".to_string(),
                tipo_mime: "application/pdf".to_string(),
                categoria: "identidade".to_string(),
            },
        )
        .await
        .expect("attached");
    let intruder = service
        .attach_document(
            &outsider(&fixture),
            projeto.id,
            NewDocument {
                nome_arquivo: "x.pdf".to_string(),
                tipo_mime: "application/pdf".to_string(),
                categoria: "outros".to_string(),
            },
        )
        .await;

    assert!(matches!(intruder, Err(ProjectError::ProjectNotFound(_))));
    let documentos = service
        .documents(&fixture.gestor, projeto.id)
        .await
        .expect("listed");
    assert_eq!(documentos.len(), 1);
    assert_eq!(documentos[0].nome_arquivo, "rg.pdf");
}

#[tokio::test]
async fn habilitation_decisions_are_recorded_and_announced() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::Habilitacao, 2).await;
    let maria = fixture.proponent("maria@example.org");
    let projeto = fixture
        .project(&edital, &maria, "Ciranda", "Roda de ciranda", 1_000.0)
        .await;
    let service = service(&fixture);

    let missing_reason = service
        .decide_habilitation(&fixture.gestor, projeto.id, HabilitationDecision::Inabilitado, None)
        .await;
    assert!(matches!(missing_reason, Err(ProjectError::Invalid(_))));

    let decided = service
        .decide_habilitation(
            &fixture.gestor,
            projeto.id,
            HabilitationDecision::Inabilitado,
            Some("Certidão municipal vencida".to_string()),
        )
        .await
        .expect("decided");
    fixture.notifier.drain().await;

    assert_eq!(decided.status_habilitacao, HabilitationStatus::Inabilitado);
    assert_eq!(
        decided.motivo_habilitacao.as_deref(),
        Some("Certidão municipal vencida")
    );
    let sent = fixture.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "maria@example.org");
    assert_eq!(sent[0].template, "habilitacao_decidida");
    assert!(sent[0].html.contains("Certidão municipal vencida"));

    let forbidden = service
        .decide_habilitation(&maria, projeto.id, HabilitationDecision::Habilitado, None)
        .await;
    assert!(matches!(forbidden, Err(ProjectError::Forbidden(_))));
}

#[tokio::test]
async fn ranking_orders_habilitated_projects_and_fills_vagas() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::ResultadoFinal, 1).await;
    let maria = fixture.proponent("maria@example.org");
    let first = fixture.project(&edital, &maria, "Ciranda", "Roda", 1_000.0).await;
    let second = fixture.project(&edital, &maria, "Coco", "Roda de coco", 2_000.0).await;
    let excluded = fixture.project(&edital, &maria, "Sarau", "Poesia", 3_000.0).await;
    let unscored = fixture.project(&edital, &maria, "Cordel", "Leitura", 4_000.0).await;
    let service = service(&fixture);
    for projeto in [&first, &second, &unscored] {
        service
            .decide_habilitation(
                &fixture.gestor,
                projeto.id,
                HabilitationDecision::Habilitado,
                None,
            )
            .await
            .expect("habilitado");
    }
    service
        .decide_habilitation(
            &fixture.gestor,
            excluded.id,
            HabilitationDecision::Inabilitado,
            Some("Documentação incompleta".to_string()),
        )
        .await
        .expect("inabilitado");
    finalized_totals(
        &fixture,
        edital.id,
        &[
            (&first, vec![8.0, 9.0]),
            (&second, vec![7.0]),
            (&excluded, vec![9.5]),
        ],
    )
    .await;

    let ranking = service
        .compute_ranking(&fixture.gestor, edital.id)
        .await
        .expect("ranking computed");
    fixture.notifier.drain().await;

    let summary: Vec<_> = ranking
        .iter()
        .map(|entry| (entry.projeto_id, entry.posicao, entry.nota_final, entry.status_selecao))
        .collect();
    assert_eq!(summary[0], (first.id, Some(1), Some(8.5), SelectionStatus::Selecionado));
    assert_eq!(summary[1], (second.id, Some(2), Some(7.0), SelectionStatus::Suplente));
    assert_eq!(summary.len(), 4);
    for (projeto_id, posicao, _, status) in &summary[2..] {
        assert!(*projeto_id == excluded.id || *projeto_id == unscored.id);
        assert_eq!(*posicao, None);
        assert_eq!(*status, SelectionStatus::NaoSelecionado);
    }

    let stored = service
        .get(&fixture.gestor, first.id)
        .await
        .expect("project loads");
    assert_eq!(stored.nota_final, Some(8.5));
    assert_eq!(stored.status_selecao, SelectionStatus::Selecionado);
}

#[tokio::test]
async fn ranking_is_reserved_to_managers() {
    let fixture = Fixture::new();
    let edital = fixture.edital_in(Phase::ResultadoFinal, 1).await;

    let result = service(&fixture)
        .compute_ranking(&fixture.actor(Role::Avaliador), edital.id)
        .await;

    assert!(matches!(result, Err(ProjectError::Forbidden(_))));
}
