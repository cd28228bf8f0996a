//! The variant catalog: a compiled-in table of ship skins.
//!
//! Players persist only the ids they own and the id they fly; every other
//! attribute is looked up here. Ids are stable and appear in remote rows,
//! so entries are append-only.

use crate::types::{Millis, VariantId};
use serde::Serialize;

pub const DEFAULT_VARIANT: VariantId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Variant {
    pub id:               VariantId,
    pub name:             &'static str,
    pub cost:             u64,
    /// Score earned by one tap before any bonus multiplier.
    pub score_multiplier: u64,
    pub resource_capacity: f64,
    pub regen_seconds:    u32,
}

impl Variant {
    pub fn regen_ms(&self) -> Millis {
        Millis::from(self.regen_seconds) * 1000
    }
}

static VARIANTS: [Variant; 6] = [
    Variant { id: 0, name: "Classic",     cost: 0,       score_multiplier: 1,  resource_capacity: 1000.0, regen_seconds: 3 },
    Variant { id: 1, name: "Comet",       cost: 1_000,   score_multiplier: 2,  resource_capacity: 500.0,  regen_seconds: 2 },
    Variant { id: 2, name: "Nebula",      cost: 5_000,   score_multiplier: 2,  resource_capacity: 1500.0, regen_seconds: 3 },
    Variant { id: 3, name: "Supernova",   cost: 25_000,  score_multiplier: 3,  resource_capacity: 2000.0, regen_seconds: 2 },
    Variant { id: 4, name: "Quasar",      cost: 100_000, score_multiplier: 5,  resource_capacity: 2500.0, regen_seconds: 2 },
    Variant { id: 5, name: "Singularity", cost: 500_000, score_multiplier: 10, resource_capacity: 5000.0, regen_seconds: 1 },
];

pub struct VariantCatalog;

impl VariantCatalog {
    pub fn all() -> &'static [Variant] {
        &VARIANTS
    }

    pub fn get(id: VariantId) -> Option<&'static Variant> {
        VARIANTS.iter().find(|v| v.id == id)
    }

    /// Lookup that never fails: unknown ids resolve to the default variant.
    pub fn resolve(id: VariantId) -> &'static Variant {
        Self::get(id).unwrap_or(&VARIANTS[0])
    }

    pub fn default_variant() -> &'static Variant {
        &VARIANTS[0]
    }
}
