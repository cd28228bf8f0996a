//! Seeded random number generation.
//!
//! RULE: Nothing in the core calls a platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the session seed.
//!
//! Each concern gets its own stream, seeded from
//! (seed XOR slot_index * golden-ratio constant). This means:
//!   - Adding a new stream never changes existing streams.
//!   - A given seed replays the same rewards and bonus timings.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single concern.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    pub fn new(seed: u64, slot_index: u64) -> Self {
        let derived_seed = seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform integer in the inclusive range [lo, hi].
    pub fn int_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u64_below(hi - lo + 1)
    }

    /// Uniform millisecond span in [lo, hi).
    pub fn span_ms(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        lo + (self.next_f64() * (hi - lo) as f64) as i64
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

/// Factory for every stream of one session.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries; only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    TimedReward = 0,
    BonusDelay = 1,
    BonusPosition = 2,
    BonusDuration = 3,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TimedReward => "timed_reward",
            Self::BonusDelay => "bonus_delay",
            Self::BonusPosition => "bonus_position",
            Self::BonusDuration => "bonus_duration",
        }
    }
}

/// The streams a running session draws from.
pub struct SessionRng {
    pub reward:   StreamRng,
    pub delay:    StreamRng,
    pub position: StreamRng,
    pub duration: StreamRng,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            reward:   bank.stream(StreamSlot::TimedReward),
            delay:    bank.stream(StreamSlot::BonusDelay),
            position: bank.stream(StreamSlot::BonusPosition),
            duration: bank.stream(StreamSlot::BonusDuration),
        }
    }
}
