//! Remote store client: the authoritative, shared profile table.
//!
//! Two implementations ship with the core:
//!   - `RestRemoteStore` talks to a PostgREST-style HTTP endpoint.
//!   - `MemoryRemoteStore` keeps rows in process, with switches to
//!     simulate outages and rejected writes.

mod memory;
mod rest;

pub use memory::MemoryRemoteStore;
pub use rest::RestRemoteStore;

use crate::{
    catalog::DEFAULT_VARIANT,
    error::RemoteResult,
    profile::{Profile, ProfilePatch},
    types::{Millis, VariantId},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// The row for `identity`, or `RemoteError::NotFound`.
    async fn fetch(&self, identity: &str) -> RemoteResult<Profile>;

    /// Create the row for `identity`. Fails with `Conflict` if it exists.
    async fn insert(&self, identity: &str, profile: &Profile) -> RemoteResult<()>;

    /// Patch the row for `identity`, leaving absent fields untouched.
    async fn update(&self, identity: &str, patch: &ProfilePatch) -> RemoteResult<()>;

    /// The `limit` highest scores, descending. Ties keep the store's
    /// native row order.
    async fn top_scores(&self, limit: usize) -> RemoteResult<Vec<Profile>>;
}

/// The profile row exactly as the remote table stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRow {
    pub username:         String,
    pub score:            i64,
    pub energy:           f64,
    #[serde(default)]
    pub last_updated:     Option<Millis>,
    #[serde(default)]
    pub last_reward_time: Option<Millis>,
    #[serde(default)]
    pub owned_skins:      Option<Vec<VariantId>>,
    #[serde(default)]
    pub active_skin:      Option<VariantId>,
}

impl RemoteRow {
    pub fn from_profile(identity: &str, profile: &Profile) -> Self {
        Self {
            username:         identity.to_string(),
            score:            i64::try_from(profile.score).unwrap_or(i64::MAX),
            energy:           profile.resource,
            last_updated:     Some(profile.last_synced_at),
            last_reward_time: profile.last_timed_reward_at,
            owned_skins:      Some(profile.owned_variants.iter().copied().collect()),
            active_skin:      Some(profile.active_variant),
        }
    }

    /// Decode into a profile. Absent variant columns fall back to the
    /// default variant. A missing or zero `last_updated` decodes as 0,
    /// which the login treats as "no time away".
    pub fn into_profile(self) -> Profile {
        let owned = self.owned_skins.unwrap_or_else(|| vec![DEFAULT_VARIANT]);
        Profile {
            identity:             self.username,
            score:                self.score.max(0) as u64,
            resource:             self.energy,
            last_synced_at:       self.last_updated.filter(|&at| at > 0).unwrap_or(0),
            last_timed_reward_at: self.last_reward_time,
            owned_variants:       owned.into_iter().collect(),
            active_variant:       self.active_skin.unwrap_or(DEFAULT_VARIANT),
        }
        .normalized()
    }

    /// Apply a partial patch at the row level.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(score) = patch.score {
            self.score = i64::try_from(score).unwrap_or(i64::MAX);
        }
        if let Some(energy) = patch.resource {
            self.energy = energy;
        }
        if let Some(at) = patch.last_updated {
            self.last_updated = Some(at);
        }
        if let Some(at) = patch.last_timed_reward_at {
            self.last_reward_time = Some(at);
        }
        if let Some(owned) = &patch.owned_variants {
            self.owned_skins = Some(owned.clone());
        }
        if let Some(active) = patch.active_variant {
            self.active_skin = Some(active);
        }
    }
}
