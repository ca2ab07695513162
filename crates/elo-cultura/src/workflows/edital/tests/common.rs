use std::sync::Arc;

use axum::Router;

use crate::store::MemoryStore;
use crate::test_support::Fixture;
use crate::workflows::edital::{edital_router, EditalStateMachine};

pub(super) fn machine(fixture: &Fixture) -> EditalStateMachine<MemoryStore> {
    EditalStateMachine::new(fixture.store.clone(), fixture.notifier.clone())
}

pub(super) fn router(fixture: &Fixture) -> Router {
    edital_router(Arc::new(machine(fixture)))
}
