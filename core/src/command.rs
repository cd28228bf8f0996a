use crate::types::VariantId;
use serde::{Deserialize, Serialize};

/// Every command a front end can issue against the core.
/// Variants are only ever added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Session ───────────────────────────────────
    Login { identity: String },
    Resume,
    Logout,
    State,

    // ── Gameplay ──────────────────────────────────
    Tap {
        #[serde(default = "one")]
        count: u32,
    },
    ClaimReward,
    TriggerBonus,
    Purchase { variant: VariantId },
    Equip { variant: VariantId },
    Reset,

    // ── Views ─────────────────────────────────────
    Leaderboard,
    Catalog,
}

fn one() -> u32 {
    1
}
