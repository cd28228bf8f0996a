//! Wall-clock sources and the countdown formatter.
//!
//! RULE: Nothing in the core reads the system time directly.
//! Everything asks the injected WallClock, so tests can move time by hand.

use crate::types::Millis;
use std::sync::atomic::{AtomicI64, Ordering};

pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> Millis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self { now: AtomicI64::new(start) }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `ms`. Returns the new time.
    pub fn advance(&self, ms: Millis) -> Millis {
        self.now.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Remaining cooldown before the timed reward can be claimed, as `m:ss`
/// (or `h:mm:ss` past the hour). Empty once the reward is claimable.
pub fn reward_countdown(now: Millis, last_claimed_at: Millis, cooldown_ms: Millis) -> String {
    let elapsed = now.saturating_sub(last_claimed_at);
    if elapsed >= cooldown_ms {
        return String::new();
    }
    let remaining_secs = cooldown_ms.saturating_sub(elapsed) / 1000;
    let hours = remaining_secs / 3600;
    let minutes = (remaining_secs / 60) % 60;
    let seconds = remaining_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
