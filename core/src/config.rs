use crate::types::Millis;
use serde::{Deserialize, Serialize};

// ── Economy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EconomyConfig {
    /// Energy consumed by one tap.
    pub tap_cost: f64,
    /// Minimum time between two timed-reward claims.
    pub reward_cooldown_ms: Millis,
    pub reward_min: u64,
    pub reward_max: u64,
    /// Score multiplier granted by a claimed bonus.
    pub bonus_factor: u64,
    pub bonus_duration_min_ms: Millis,
    pub bonus_duration_max_ms: Millis,
    /// Random delay before the next bonus is armed.
    pub bonus_spawn_min_delay_ms: Millis,
    pub bonus_spawn_max_delay_ms: Millis,
    /// An armed bonus disappears after this long if nobody claims it.
    pub bonus_timeout_ms: Millis,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            tap_cost:                 1.0,
            reward_cooldown_ms:       3_600_000,
            reward_min:               50,
            reward_max:               500,
            bonus_factor:             10,
            bonus_duration_min_ms:    5_000,
            bonus_duration_max_ms:    15_000,
            bonus_spawn_min_delay_ms: 20_000,
            bonus_spawn_max_delay_ms: 100_000,
            bonus_timeout_ms:         8_000,
        }
    }
}

// ── Sync cadence ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Period of the cache-write + remote-push tick.
    pub sync_interval_ms: u64,
    pub multiplier_poll_ms: u64,
    pub countdown_interval_ms: u64,
    /// Upper bound on how long the regen and bonus tasks sleep before
    /// re-reading the wall clock.
    pub max_task_sleep_ms: u64,
    pub leaderboard_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms:      3_000,
            multiplier_poll_ms:    1_000,
            countdown_interval_ms: 1_000,
            max_task_sleep_ms:     1_000,
            leaderboard_limit:     50,
        }
    }
}

// ── Remote store ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key:  String,
    #[serde(default = "default_table")]
    pub table:    String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "profiles".into()
}

fn default_timeout_secs() -> u64 {
    10
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub economy: EconomyConfig,
    pub sync:    SyncConfig,
    pub remote:  Option<RemoteConfig>,
}

impl CoreConfig {
    /// Load from `{data_dir}/config.json`. Missing keys take their defaults.
    /// In tests, use CoreConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CoreConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let e = &self.economy;
        if e.reward_min > e.reward_max {
            anyhow::bail!("reward_min {} exceeds reward_max {}", e.reward_min, e.reward_max);
        }
        if e.bonus_duration_min_ms > e.bonus_duration_max_ms {
            anyhow::bail!("bonus duration range is inverted");
        }
        if e.bonus_spawn_min_delay_ms > e.bonus_spawn_max_delay_ms {
            anyhow::bail!("bonus spawn delay range is inverted");
        }
        if e.tap_cost <= 0.0 {
            anyhow::bail!("tap_cost must be positive");
        }
        if self.sync.sync_interval_ms == 0 || self.sync.max_task_sleep_ms == 0 {
            anyhow::bail!("task intervals must be non-zero");
        }
        Ok(())
    }

    /// Defaults with no remote configured.
    pub fn default_test() -> Self {
        Self::default()
    }
}
