//! Project intake, documentary habilitation and the final ranking.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Documento, HabilitationDecision, HabilitationStatus, NewDocument, ProjectDraft, Projeto,
    RankingEntry, SelectionStatus,
};
pub use repository::ProjectRepository;
pub use router::project_router;
pub use service::{protocol_number, ProjectError, ProjectService};
