//! Local profile cache: one JSON profile per identity on top of the
//! key-value store.
//!
//! The cache never fails observably. Persistence and decoding errors are
//! logged and read back as a miss, so gameplay keeps going on whatever
//! state is in memory.

use crate::{
    clock::WallClock,
    profile::Profile,
    store::LocalStore,
    types::Millis,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Every key this core writes lives under this namespace.
pub const CACHE_NAMESPACE: &str = "cosmic_clicker.v2";

pub(crate) fn profile_key(identity: &str) -> String {
    format!("{CACHE_NAMESPACE}/profile/{identity}")
}

pub(crate) fn lock_store(store: &Mutex<LocalStore>) -> Option<MutexGuard<'_, LocalStore>> {
    match store.lock() {
        Ok(guard) => Some(guard),
        Err(e) => {
            log::warn!("Local store lock poisoned: {e}");
            None
        }
    }
}

#[derive(Clone)]
pub struct LocalCache {
    store: Arc<Mutex<LocalStore>>,
    clock: Arc<dyn WallClock>,
}

impl LocalCache {
    pub fn new(store: Arc<Mutex<LocalStore>>, clock: Arc<dyn WallClock>) -> Self {
        Self { store, clock }
    }

    /// The cached profile for `identity`, if any.
    pub fn read(&self, identity: &str) -> Option<Profile> {
        let store = lock_store(&self.store)?;
        let raw = match store.get(&profile_key(identity)) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Cache read for '{identity}' failed: {e}");
                return None;
            }
        };
        match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) => Some(profile.normalized()),
            Err(e) => {
                log::warn!("Cached profile for '{identity}' is unreadable: {e}");
                None
            }
        }
    }

    /// Store `profile` under `identity`, stamping the stored copy's
    /// `last_synced_at` with the current time. Returns the stamp.
    pub fn write(&self, identity: &str, profile: &Profile) -> Millis {
        let now = self.clock.now_ms();
        let mut stamped = profile.clone();
        stamped.identity = identity.to_string();
        stamped.last_synced_at = now;

        let json = match serde_json::to_string(&stamped) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Cannot serialize profile '{identity}': {e}");
                return now;
            }
        };
        if let Some(store) = lock_store(&self.store) {
            if let Err(e) = store.put(&profile_key(identity), &json, now) {
                log::warn!("Cache write for '{identity}' failed: {e}");
            }
        }
        now
    }

    /// Every cached profile, highest score first, at most `limit`.
    /// Serves as the ranking when the remote store is unreachable.
    pub fn top_scores(&self, limit: usize) -> Vec<Profile> {
        let Some(store) = lock_store(&self.store) else {
            return Vec::new();
        };
        let prefix = profile_key("");
        let rows = match store.scan_prefix(&prefix) {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("Cache scan failed: {e}");
                return Vec::new();
            }
        };
        let mut profiles: Vec<Profile> = rows
            .into_iter()
            .filter_map(|(_, raw)| serde_json::from_str::<Profile>(&raw).ok())
            .collect();
        profiles.sort_by(|a, b| b.score.cmp(&a.score));
        profiles.truncate(limit);
        profiles
    }
}
