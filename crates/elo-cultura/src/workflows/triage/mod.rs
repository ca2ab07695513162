//! AI-assisted triage: per-project habilitation and criterion suggestions plus duplicate
//! detection, persisted as one execution per run.

pub mod domain;
pub mod gate;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod prompts;
pub mod repository;
pub mod router;
pub mod schema;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use domain::{
    ExecutionStatus, FlagKind, HabilitationSuggestion, IrregularityFlag, TriageReport,
    TriageResultDetail, TriagemExecucao, TriagemNota, TriagemResultado,
};
pub use gate::RunGate;
pub use model::{ChatPrompt, ProviderError, TriageModel, UnconfiguredModel};
pub use openai::OpenAiClient;
pub use orchestrator::{TriageError, TriageOrchestrator, TriageSettings};
pub use repository::TriageRepository;
pub use router::triage_router;
pub use schema::{DecodeError, HabilitationAnalysis, SuggestedScore, FALLBACK_CONFIDENCE};
pub use similarity::{text_similarity, SimilarityDetector, SimilarityFlag, SimilarityInput};
