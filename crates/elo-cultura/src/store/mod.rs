//! Persistence boundary. Each workflow module declares the repository trait it needs; the
//! in-memory backend implements all of them for tests, demos and single-node deployments.

pub mod memory;

pub use memory::{FailurePoint, MemoryStore};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness constraint or an optimistic version check failed.
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
