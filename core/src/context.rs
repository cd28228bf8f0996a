//! The injected service context: every handle the reconciliation engine
//! and the running session need, built once and passed in explicitly.

use crate::{
    cache::LocalCache,
    clock::{SystemClock, WallClock},
    config::CoreConfig,
    error::CoreResult,
    remote::{MemoryRemoteStore, RemoteStore, RestRemoteStore},
    session::SessionManager,
    store::LocalStore,
};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct CoreContext {
    pub cache:   LocalCache,
    pub session: SessionManager,
    pub remote:  Arc<dyn RemoteStore>,
    pub clock:   Arc<dyn WallClock>,
    pub config:  Arc<CoreConfig>,
}

impl CoreContext {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn WallClock>,
        config: CoreConfig,
    ) -> Self {
        let store = Arc::new(Mutex::new(store));
        Self {
            cache: LocalCache::new(Arc::clone(&store), Arc::clone(&clock)),
            session: SessionManager::new(store, Arc::clone(&clock)),
            remote,
            clock,
            config: Arc::new(config),
        }
    }

    /// Production wiring: SQLite cache at `db_path`, the system clock, and
    /// the HTTP remote if one is configured. Without a remote URL the
    /// core runs against an in-process store.
    pub fn from_config(db_path: &str, config: CoreConfig) -> CoreResult<Self> {
        let store = LocalStore::open_or_memory(db_path)?;
        let remote: Arc<dyn RemoteStore> = match &config.remote {
            Some(remote) => Arc::new(RestRemoteStore::new(remote)?),
            None => {
                log::info!("No remote store configured; using in-process store");
                Arc::new(MemoryRemoteStore::new())
            }
        };
        Ok(Self::new(store, remote, Arc::new(SystemClock), config))
    }

    pub fn now_ms(&self) -> crate::types::Millis {
        self.clock.now_ms()
    }
}
