//! Shared wiring for the integration tests: an in-memory cache, an
//! in-process remote store, and a hand-driven wall clock.

#![allow(dead_code)]

use cosmic_core::{
    clock::ManualClock,
    config::CoreConfig,
    context::CoreContext,
    reconcile::ReconciliationEngine,
    remote::MemoryRemoteStore,
    store::LocalStore,
    types::Millis,
};
use std::sync::Arc;
use std::time::Duration;

pub const T0: Millis = 1_700_000_000_000;

pub struct Harness {
    pub clock:  Arc<ManualClock>,
    pub remote: Arc<MemoryRemoteStore>,
    pub ctx:    CoreContext,
}

pub fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = LocalStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let clock = Arc::new(ManualClock::new(T0));
    let remote = Arc::new(MemoryRemoteStore::new());
    let ctx = CoreContext::new(
        store,
        remote.clone(),
        clock.clone(),
        CoreConfig::default_test(),
    );
    Harness { clock, remote, ctx }
}

impl Harness {
    pub fn engine(&self) -> Arc<ReconciliationEngine> {
        Arc::new(ReconciliationEngine::new(self.ctx.clone()))
    }

    /// Move both the wall clock and tokio's paused clock forward, then
    /// let every woken task run.
    pub async fn advance(&self, ms: Millis) {
        self.clock.advance(ms);
        tokio::time::advance(Duration::from_millis(ms as u64)).await;
        settle().await;
    }

    /// Advance in one-second steps.
    pub async fn advance_secs(&self, secs: u32) {
        for _ in 0..secs {
            self.advance(1_000).await;
        }
    }
}

/// Yield enough times for spawned pushes to finish.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
