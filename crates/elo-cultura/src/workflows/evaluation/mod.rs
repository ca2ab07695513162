//! Evaluator assignment, rubric scoring and the weighted aggregate shared with AI triage.

pub mod aggregator;
pub mod assignment;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{round2, weighted_average, WeightedScore};
pub use assignment::{
    AssignmentDiff, AssignmentError, AssignmentMatrix, AssignmentPair, AssignmentSummary,
};
pub use domain::{
    Avaliacao, AvaliacaoCriterio, Criterio, CriterionScore, EvaluationStatus, NewCriterio,
};
pub use repository::{AssignmentChange, AssignmentSnapshot, EvaluationRepository};
pub use router::{evaluation_router, EvaluationState};
pub use service::{EvaluationError, EvaluationService, EvaluationSheet};
