//! Core services for running municipal cultural grant calls (editais): the phase lifecycle,
//! evaluator assignment and scoring, AI-assisted triage, appeals and accountability reports.

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod notifications;
pub mod store;
pub mod telemetry;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_support;
