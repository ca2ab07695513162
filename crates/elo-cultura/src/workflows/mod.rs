pub mod accountability;
pub mod appeals;
pub mod edital;
pub mod evaluation;
pub(crate) mod http;
pub mod projects;
pub mod triage;
