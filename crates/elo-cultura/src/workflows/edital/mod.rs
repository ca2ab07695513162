//! Edital lifecycle: the ordered phase table and the single-step state machine driving it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod state_machine;

#[cfg(test)]
mod tests;

pub use domain::{
    Edital, EditalFase, NewEdital, Phase, PhaseAdvance, PhaseCompleteness, PhaseTransition,
    PhaseWindow,
};
pub use repository::EditalRepository;
pub use router::edital_router;
pub use state_machine::{EditalError, EditalStateMachine};
