//! Recursos: appeals filed by proponents during the appeal phases and decided by managers.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{AppealDecision, NewRecurso, Recurso, RecursoStatus, RecursoTipo};
pub use repository::AppealRepository;
pub use router::appeal_router;
pub use service::{AppealError, AppealService};
