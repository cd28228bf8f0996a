//! The persistent player profile and the partial patch pushed upstream.

use crate::{
    catalog::{Variant, VariantCatalog, DEFAULT_VARIANT},
    types::{Identity, Millis, VariantId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub identity:             Identity,
    pub score:                u64,
    pub resource:             f64,
    pub last_synced_at:       Millis,
    /// `None` until the first timed reward is claimed.
    pub last_timed_reward_at: Option<Millis>,
    pub owned_variants:       BTreeSet<VariantId>,
    pub active_variant:       VariantId,
}

impl Profile {
    /// A brand-new profile: zero score, full energy, only the default
    /// variant owned and equipped.
    pub fn new_default(identity: impl Into<Identity>, now: Millis) -> Self {
        let variant = VariantCatalog::default_variant();
        Self {
            identity:             identity.into(),
            score:                0,
            resource:             variant.resource_capacity,
            last_synced_at:       now,
            last_timed_reward_at: None,
            owned_variants:       BTreeSet::from([DEFAULT_VARIANT]),
            active_variant:       DEFAULT_VARIANT,
        }
    }

    pub fn variant(&self) -> &'static Variant {
        VariantCatalog::resolve(self.active_variant)
    }

    pub fn resource_capacity(&self) -> f64 {
        self.variant().resource_capacity
    }

    pub fn owns(&self, id: VariantId) -> bool {
        self.owned_variants.contains(&id)
    }

    /// Repair anything a foreign writer may have left inconsistent: the
    /// default variant is always owned, the active variant is owned and
    /// known, and energy lies inside [0, capacity].
    pub fn normalized(mut self) -> Self {
        self.owned_variants.insert(DEFAULT_VARIANT);
        if !self.owns(self.active_variant) || VariantCatalog::get(self.active_variant).is_none() {
            self.active_variant = DEFAULT_VARIANT;
        }
        if !self.resource.is_finite() {
            self.resource = 0.0;
        }
        self.resource = self.resource.clamp(0.0, self.resource_capacity());
        self
    }

    /// Fields that matter for progress, stamped with the push time.
    pub fn progress_patch(&self, now: Millis) -> ProfilePatch {
        ProfilePatch {
            score:                Some(self.score),
            resource:             Some(self.resource),
            last_updated:         Some(now),
            last_timed_reward_at: self.last_timed_reward_at,
            owned_variants:       Some(self.owned_variants.iter().copied().collect()),
            active_variant:       Some(self.active_variant),
        }
    }
}

/// A row-level partial update. `None` fields are left untouched remotely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score:                Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "energy")]
    pub resource:             Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated:         Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "last_reward_time")]
    pub last_timed_reward_at: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "owned_skins")]
    pub owned_variants:       Option<Vec<VariantId>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "active_skin")]
    pub active_variant:       Option<VariantId>,
}

impl ProfilePatch {
    /// Apply this patch on top of an existing profile.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(score) = self.score {
            profile.score = score;
        }
        if let Some(resource) = self.resource {
            profile.resource = resource;
        }
        if let Some(at) = self.last_updated {
            profile.last_synced_at = at;
        }
        if let Some(at) = self.last_timed_reward_at {
            profile.last_timed_reward_at = Some(at);
        }
        if let Some(owned) = &self.owned_variants {
            profile.owned_variants = owned.iter().copied().collect();
        }
        if let Some(active) = self.active_variant {
            profile.active_variant = active;
        }
    }
}
