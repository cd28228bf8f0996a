//! Session manager: remembers which identity was last logged in, so a
//! restarted client can resume without asking again.

use crate::{
    cache::{lock_store, CACHE_NAMESPACE},
    clock::WallClock,
    store::LocalStore,
    types::Identity,
};
use std::sync::{Arc, Mutex};

fn session_key() -> String {
    format!("{CACHE_NAMESPACE}/session/current")
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<Mutex<LocalStore>>,
    clock: Arc<dyn WallClock>,
}

impl SessionManager {
    pub fn new(store: Arc<Mutex<LocalStore>>, clock: Arc<dyn WallClock>) -> Self {
        Self { store, clock }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        let store = lock_store(&self.store)?;
        match store.get(&session_key()) {
            Ok(identity) => identity.filter(|i| !i.is_empty()),
            Err(e) => {
                log::warn!("Session slot unreadable: {e}");
                None
            }
        }
    }

    pub fn bind(&self, identity: &str) {
        if let Some(store) = lock_store(&self.store) {
            if let Err(e) = store.put(&session_key(), identity, self.clock.now_ms()) {
                log::warn!("Cannot persist session for '{identity}': {e}");
            }
        }
    }

    pub fn clear(&self) {
        if let Some(store) = lock_store(&self.store) {
            if let Err(e) = store.delete(&session_key()) {
                log::warn!("Cannot clear session slot: {e}");
            }
        }
    }
}
