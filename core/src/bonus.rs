//! Runtime-only bonus state: the randomly spawned bonus window and the
//! score multiplier it grants when claimed.
//!
//! Neither window is persisted. A reloaded session always starts with
//! an inactive multiplier and a freshly scheduled spawn.
//!
//! The spawner is a state machine:
//!
//!   Idle ──(delay elapsed)──▶ Armed ──(claim)────▶ Idle (rescheduled)
//!                               └───(timeout)───▶ Idle (rescheduled)

use crate::{
    config::EconomyConfig,
    error::Rejection,
    rng::SessionRng,
    types::Millis,
};
use serde::{Deserialize, Serialize};

/// Where the bonus appears, in percent of the play area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BonusPosition {
    pub top_pct:  f64,
    pub left_pct: f64,
}

const POSITION_MIN_PCT: f64 = 10.0;
const POSITION_MAX_PCT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BonusPhase {
    Idle { next_spawn_at: Millis },
    Armed { position: BonusPosition, expires_at: Millis },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusResolution {
    Claimed,
    Expired,
}

/// Something the spawner did during a poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BonusTransition {
    Armed(BonusPosition),
    Expired,
}

#[derive(Debug, Clone)]
pub struct BonusWindow {
    phase: BonusPhase,
    last_resolution: Option<BonusResolution>,
}

impl BonusWindow {
    /// Start idle with a random delay before the first spawn.
    pub fn scheduled(now: Millis, config: &EconomyConfig, rng: &mut SessionRng) -> Self {
        Self {
            phase: Self::next_idle(now, config, rng),
            last_resolution: None,
        }
    }

    fn next_idle(now: Millis, config: &EconomyConfig, rng: &mut SessionRng) -> BonusPhase {
        let delay = rng
            .delay
            .span_ms(config.bonus_spawn_min_delay_ms, config.bonus_spawn_max_delay_ms);
        BonusPhase::Idle { next_spawn_at: now + delay }
    }

    pub fn phase(&self) -> BonusPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, BonusPhase::Armed { .. })
    }

    pub fn position(&self) -> Option<BonusPosition> {
        match self.phase {
            BonusPhase::Armed { position, .. } => Some(position),
            BonusPhase::Idle { .. } => None,
        }
    }

    pub fn expires_at(&self) -> Option<Millis> {
        match self.phase {
            BonusPhase::Armed { expires_at, .. } => Some(expires_at),
            BonusPhase::Idle { .. } => None,
        }
    }

    pub fn last_resolution(&self) -> Option<BonusResolution> {
        self.last_resolution
    }

    /// The next wall-clock instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Millis {
        match self.phase {
            BonusPhase::Idle { next_spawn_at } => next_spawn_at,
            BonusPhase::Armed { expires_at, .. } => expires_at,
        }
    }

    /// Advance the state machine to `now`.
    pub fn poll(
        &mut self,
        now: Millis,
        config: &EconomyConfig,
        rng: &mut SessionRng,
    ) -> Option<BonusTransition> {
        match self.phase {
            BonusPhase::Idle { next_spawn_at } if now >= next_spawn_at => {
                let position = BonusPosition {
                    top_pct:  rng.position.uniform(POSITION_MIN_PCT, POSITION_MAX_PCT),
                    left_pct: rng.position.uniform(POSITION_MIN_PCT, POSITION_MAX_PCT),
                };
                self.phase = BonusPhase::Armed {
                    position,
                    expires_at: now + config.bonus_timeout_ms,
                };
                Some(BonusTransition::Armed(position))
            }
            BonusPhase::Armed { expires_at, .. } if now >= expires_at => {
                self.last_resolution = Some(BonusResolution::Expired);
                self.phase = Self::next_idle(now, config, rng);
                Some(BonusTransition::Expired)
            }
            _ => None,
        }
    }

    /// Claim an armed bonus. The window closes and the next spawn is
    /// scheduled straight away.
    pub fn claim(
        &mut self,
        now: Millis,
        config: &EconomyConfig,
        rng: &mut SessionRng,
    ) -> Result<(), Rejection> {
        match self.phase {
            BonusPhase::Armed { expires_at, .. } if now < expires_at => {
                self.last_resolution = Some(BonusResolution::Claimed);
                self.phase = Self::next_idle(now, config, rng);
                Ok(())
            }
            _ => Err(Rejection::NoBonusArmed),
        }
    }
}

/// A temporary score multiplier. Factor 1 means inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierWindow {
    pub factor:     u64,
    pub expires_at: Millis,
}

impl Default for MultiplierWindow {
    fn default() -> Self {
        Self::inactive()
    }
}

impl MultiplierWindow {
    pub fn inactive() -> Self {
        Self { factor: 1, expires_at: 0 }
    }

    pub fn boosted(factor: u64, expires_at: Millis) -> Self {
        Self { factor, expires_at }
    }

    pub fn is_active_at(&self, now: Millis) -> bool {
        self.factor > 1 && now <= self.expires_at
    }

    /// The factor a tap at `now` earns. Reads the wall clock rather than
    /// trusting the poll cadence, so a late poll never over-pays.
    pub fn factor_at(&self, now: Millis) -> u64 {
        if self.is_active_at(now) {
            self.factor
        } else {
            1
        }
    }

    /// Whole seconds left, rounded up. Zero when inactive.
    pub fn remaining_secs(&self, now: Millis) -> i64 {
        if !self.is_active_at(now) {
            return 0;
        }
        let remaining = self.expires_at - now;
        (remaining + 999) / 1000
    }

    /// Deactivate once `now > expires_at`. Returns true if this call
    /// switched the multiplier off.
    pub fn poll(&mut self, now: Millis) -> bool {
        if self.factor > 1 && now > self.expires_at {
            *self = Self::inactive();
            return true;
        }
        false
    }
}
