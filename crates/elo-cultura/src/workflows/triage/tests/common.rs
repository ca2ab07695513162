use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::ids::CriterioId;
use crate::store::MemoryStore;
use crate::test_support::{Fixture, ScriptedModel};
use crate::workflows::triage::{ChatPrompt, ProviderError, TriageOrchestrator, TriageSettings};

pub(super) fn settings() -> TriageSettings {
    TriageSettings {
        runs_per_hour: 3,
        stale_after: chrono::Duration::minutes(30),
        similarity_threshold: 0.8,
        call_timeout: Duration::from_secs(5),
    }
}

pub(super) fn orchestrator(
    fixture: &Fixture,
    model: Arc<ScriptedModel>,
    settings: TriageSettings,
) -> TriageOrchestrator<MemoryStore> {
    TriageOrchestrator::new(fixture.store.clone(), model, settings)
}

pub(super) fn is_scoring(prompt: &ChatPrompt) -> bool {
    prompt.system.contains("parecerista")
}

pub(super) fn mentions(prompt: &ChatPrompt, titulo: &str) -> bool {
    prompt.user.contains(&format!("Título: {titulo}\n"))
}

/// Criterion ids listed in a scoring prompt, in order.
pub(super) fn criterion_ids(prompt: &ChatPrompt) -> Vec<CriterioId> {
    prompt
        .user
        .lines()
        .filter_map(|line| line.strip_prefix("- criterio_id: "))
        .filter_map(|rest| rest.split(" | ").next())
        .filter_map(|raw| raw.parse().ok())
        .collect()
}

pub(super) fn habilitado() -> String {
    json!({
        "sugestao": "habilitado",
        "motivo": "Documentação completa",
        "docs_completos": true,
        "problemas": []
    })
    .to_string()
}

/// Scores the listed criteria with `notas`, in prompt order.
pub(super) fn scored(prompt: &ChatPrompt, notas: &[f64]) -> String {
    let avaliacoes: Vec<_> = criterion_ids(prompt)
        .into_iter()
        .zip(notas)
        .map(|(criterio_id, nota)| {
            json!({
                "criterio_id": criterio_id,
                "nota": nota,
                "justificativa": "Proposta bem fundamentada",
                "confianca": 0.9
            })
        })
        .collect();
    json!({ "avaliacoes": avaliacoes }).to_string()
}

/// Model answering every habilitation as complete and every criterion with `nota`.
pub(super) fn agreeable(nota: f64) -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::new(move |prompt: &ChatPrompt| {
        if is_scoring(prompt) {
            let notas = vec![nota; criterion_ids(prompt).len()];
            Ok(scored(prompt, &notas))
        } else {
            Ok(habilitado())
        }
    }))
}

pub(super) fn unreachable_provider() -> ProviderError {
    ProviderError::Transport("connection refused".to_string())
}
