use async_trait::async_trait;
use serde::Serialize;

/// A system plus user prompt pair that must be answered with a single JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Language model answering triage prompts with raw JSON text.
#[async_trait]
pub trait TriageModel: Send + Sync {
    async fn complete_json(&self, prompt: &ChatPrompt) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("provider answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider response had no content")]
    EmptyResponse,
    #[error("provider call exceeded {secs}s")]
    Timeout { secs: u64 },
    #[error("no language model is configured")]
    NotConfigured,
}

/// Stand-in used when no API key is configured. Every call fails, so the pipeline records its
/// documented fallbacks for each project.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredModel;

#[async_trait]
impl TriageModel for UnconfiguredModel {
    async fn complete_json(&self, _prompt: &ChatPrompt) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}
