//! Session snapshot: a read-only, serializable view of a running session
//! for whatever front end is rendering it.
//!
//! A snapshot is never read back. Restoring a session always goes through
//! login and the cache.

use crate::{
    bonus::BonusPosition,
    game::SessionState,
    reconcile::{PushRecord, SyncMode},
    types::{Identity, Millis, VariantId},
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiplierView {
    pub factor:         u64,
    pub active:         bool,
    /// Whole seconds left, rounded up.
    pub remaining_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusView {
    pub armed:      bool,
    pub position:   Option<BonusPosition>,
    pub expires_at: Option<Millis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub taken_at:          Millis,
    pub identity:          Identity,
    pub mode:              SyncMode,
    pub advisory:          Option<String>,
    pub score:             u64,
    pub resource:          f64,
    pub resource_capacity: f64,
    pub active_variant:    VariantId,
    pub owned_variants:    Vec<VariantId>,
    /// Empty when the timed reward is claimable.
    pub reward_countdown:  String,
    pub multiplier:        MultiplierView,
    pub bonus:             BonusView,
    pub last_push:         Option<PushRecord>,
}

impl SessionSnapshot {
    pub fn capture(
        state: &SessionState,
        now: Millis,
        mode: SyncMode,
        advisory: Option<String>,
        last_push: Option<PushRecord>,
    ) -> Self {
        let profile = &state.profile;
        Self {
            taken_at: now,
            identity: profile.identity.clone(),
            mode,
            advisory,
            score: profile.score,
            resource: profile.resource,
            resource_capacity: profile.resource_capacity(),
            active_variant: profile.active_variant,
            owned_variants: profile.owned_variants.iter().copied().collect(),
            reward_countdown: state.countdown.clone(),
            multiplier: MultiplierView {
                factor:         state.multiplier.factor_at(now),
                active:         state.multiplier.is_active_at(now),
                remaining_secs: state.multiplier.remaining_secs(now),
            },
            bonus: BonusView {
                armed:      state.bonus.is_active(),
                position:   state.bonus.position(),
                expires_at: state.bonus.expires_at(),
            },
            last_push,
        }
    }
}
