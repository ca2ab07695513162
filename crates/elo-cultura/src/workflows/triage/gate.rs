use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::context::RequestContext;
use crate::ids::{TenantId, UserId};

type CallerKey = (TenantId, UserId);

/// Per-caller hourly quota on triage runs.
pub struct RunGate {
    limiter: RateLimiter<CallerKey, DefaultKeyedStateStore<CallerKey>, DefaultClock>,
    runs_per_hour: NonZeroU32,
}

impl RunGate {
    pub fn new(runs_per_hour: u32) -> Self {
        let runs_per_hour = NonZeroU32::new(runs_per_hour).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_hour(runs_per_hour)),
            runs_per_hour,
        }
    }

    /// Consume one run for the caller, or report the hourly limit that was hit.
    pub fn admit(&self, ctx: &RequestContext) -> Result<(), u32> {
        self.limiter
            .check_key(&(ctx.tenant_id, ctx.actor_id))
            .map_err(|_| self.runs_per_hour.get())
    }

    pub fn runs_per_hour(&self) -> u32 {
        self.runs_per_hour.get()
    }
}

impl std::fmt::Debug for RunGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunGate")
            .field("runs_per_hour", &self.runs_per_hour)
            .finish()
    }
}
