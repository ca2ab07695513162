//! Prestação de contas: execution reports owed by selected projects.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{AccountabilityDraft, PrestacaoContas, PrestacaoStatus, ReviewDecision};
pub use repository::AccountabilityRepository;
pub use router::accountability_router;
pub use service::{AccountabilityError, AccountabilityService};
