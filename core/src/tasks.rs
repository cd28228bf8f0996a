//! The periodic tasks of a running session.
//!
//! RULE: Every task implements ClockTask. A task does whatever is due at
//! the wall-clock instant it is handed, then says how long to sleep.
//! Due work is always derived from wall-clock deadlines, never from a
//! count of wake-ups, so a late wake catches up instead of drifting.
//!
//! Tasks run under the session state lock. The state-then-store lock
//! order holds for every task that touches the cache.

use crate::{
    bonus::BonusTransition,
    clock::reward_countdown,
    config::{EconomyConfig, SyncConfig},
    economy,
    game::SessionState,
    reconcile::ReconciliationEngine,
    types::Millis,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub trait ClockTask: Send + 'static {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Delay before the first run.
    fn initial_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Do the work due at `now`. Returns the delay until the next run.
    fn run(&mut self, state: &mut SessionState, now: Millis) -> Duration;
}

fn millis(ms: Millis) -> Duration {
    Duration::from_millis(ms.max(1) as u64)
}

// ── Regeneration ─────────────────────────────────────────────────────────────

/// One unit of energy per regen interval of the active variant, anchored
/// on the wall clock. Equipping a variant with a different interval takes
/// effect at the next wake, which is never further away than
/// `max_sleep_ms`.
pub struct RegenTask {
    max_sleep_ms: Millis,
}

impl RegenTask {
    pub fn new(sync: &SyncConfig) -> Self {
        Self { max_sleep_ms: sync.max_task_sleep_ms as Millis }
    }
}

impl ClockTask for RegenTask {
    fn name(&self) -> &'static str {
        "regen"
    }

    fn run(&mut self, state: &mut SessionState, now: Millis) -> Duration {
        let regen_ms = state.profile.variant().regen_ms();
        let units = economy::regen_units(now - state.regen_anchor, regen_ms);
        if units > 0 {
            economy::regenerate(&mut state.profile, units);
            state.regen_anchor += units as Millis * regen_ms;
        } else if now < state.regen_anchor {
            // Clock stepped backwards; restart the interval from here.
            state.regen_anchor = now;
        }
        let until_next = regen_ms - (now - state.regen_anchor);
        millis(until_next.min(self.max_sleep_ms))
    }
}

// ── Multiplier expiry ────────────────────────────────────────────────────────

pub struct MultiplierExpiryTask {
    poll_ms: Millis,
}

impl MultiplierExpiryTask {
    pub fn new(sync: &SyncConfig) -> Self {
        Self { poll_ms: sync.multiplier_poll_ms as Millis }
    }
}

impl ClockTask for MultiplierExpiryTask {
    fn name(&self) -> &'static str {
        "multiplier_expiry"
    }

    fn run(&mut self, state: &mut SessionState, now: Millis) -> Duration {
        if state.multiplier.poll(now) {
            log::debug!("'{}': score multiplier expired", state.profile.identity);
        }
        millis(self.poll_ms)
    }
}

// ── Bonus spawn ──────────────────────────────────────────────────────────────

pub struct BonusSpawnTask {
    economy:      EconomyConfig,
    max_sleep_ms: Millis,
}

impl BonusSpawnTask {
    pub fn new(economy: &EconomyConfig, sync: &SyncConfig) -> Self {
        Self {
            economy:      economy.clone(),
            max_sleep_ms: sync.max_task_sleep_ms as Millis,
        }
    }
}

impl ClockTask for BonusSpawnTask {
    fn name(&self) -> &'static str {
        "bonus_spawn"
    }

    fn run(&mut self, state: &mut SessionState, now: Millis) -> Duration {
        let SessionState { bonus, rng, profile, .. } = state;
        match bonus.poll(now, &self.economy, rng) {
            Some(BonusTransition::Armed(pos)) => log::debug!(
                "'{}': bonus armed at ({:.1}%, {:.1}%)",
                profile.identity,
                pos.top_pct,
                pos.left_pct
            ),
            Some(BonusTransition::Expired) => {
                log::debug!("'{}': bonus expired unclaimed", profile.identity)
            }
            None => {}
        }
        millis((bonus.next_deadline() - now).min(self.max_sleep_ms))
    }
}

// ── Reward countdown ─────────────────────────────────────────────────────────

pub struct CountdownTask {
    cooldown_ms: Millis,
    interval_ms: Millis,
}

impl CountdownTask {
    pub fn new(economy: &EconomyConfig, sync: &SyncConfig) -> Self {
        Self {
            cooldown_ms: economy.reward_cooldown_ms,
            interval_ms: sync.countdown_interval_ms as Millis,
        }
    }
}

impl ClockTask for CountdownTask {
    fn name(&self) -> &'static str {
        "countdown"
    }

    fn run(&mut self, state: &mut SessionState, now: Millis) -> Duration {
        state.countdown = match state.profile.last_timed_reward_at {
            Some(at) => reward_countdown(now, at, self.cooldown_ms),
            None => String::new(),
        };
        millis(self.interval_ms)
    }
}

// ── Periodic sync ────────────────────────────────────────────────────────────

/// Every interval: cache write, then a background push. Never waits on
/// the network.
pub struct SyncTask {
    engine:      Arc<ReconciliationEngine>,
    interval_ms: Millis,
    cancel:      watch::Receiver<bool>,
}

impl SyncTask {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        sync: &SyncConfig,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            engine,
            interval_ms: sync.sync_interval_ms as Millis,
            cancel,
        }
    }
}

impl ClockTask for SyncTask {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn initial_delay(&self) -> Duration {
        millis(self.interval_ms)
    }

    fn run(&mut self, state: &mut SessionState, _now: Millis) -> Duration {
        state.profile.last_synced_at = self.engine.persist_local(&state.profile);
        // The handle is dropped; the push finishes or is cancelled on its own.
        let _ = self.engine.push_in_background(&state.profile, self.cancel.clone());
        millis(self.interval_ms)
    }
}
