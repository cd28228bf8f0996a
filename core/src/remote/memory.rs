use super::{RemoteRow, RemoteStore};
use crate::{
    error::{RemoteError, RemoteResult},
    profile::{Profile, ProfilePatch},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-process remote store. Rows are kept in insertion order, which is
/// the tie-break order for rankings.
#[derive(Default)]
pub struct MemoryRemoteStore {
    rows:        Mutex<Vec<RemoteRow>>,
    offline:     AtomicBool,
    deny_writes: AtomicBool,
    latency:     Mutex<Option<Duration>>,
    fetches:     AtomicUsize,
    inserts:     AtomicUsize,
    updates:     AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connection error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts and updates fail with a permission error while set.
    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// Delay every call by `latency` (tokio time).
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }

    /// Put a row in place directly, bypassing failure switches.
    pub fn seed(&self, profile: &Profile) {
        self.seed_row(RemoteRow::from_profile(&profile.identity, profile));
    }

    /// Like `seed`, for a row as some other client wrote it.
    pub fn seed_row(&self, row: RemoteRow) {
        if let Ok(mut rows) = self.rows.lock() {
            match rows.iter_mut().find(|r| r.username == row.username) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
        }
    }

    /// Read a row directly, bypassing failure switches.
    pub fn row(&self, identity: &str) -> Option<RemoteRow> {
        self.rows
            .lock()
            .ok()?
            .iter()
            .find(|r| r.username == identity)
            .cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    async fn simulate_network(&self) -> RemoteResult<()> {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::connection("remote store unreachable"));
        }
        Ok(())
    }

    fn check_writable(&self) -> RemoteResult<()> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Permission("write rejected by row policy".into()));
        }
        Ok(())
    }

    fn rows(&self) -> RemoteResult<std::sync::MutexGuard<'_, Vec<RemoteRow>>> {
        self.rows
            .lock()
            .map_err(|_| RemoteError::connection("remote store poisoned"))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(&self, identity: &str) -> RemoteResult<Profile> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        self.rows()?
            .iter()
            .find(|r| r.username == identity)
            .cloned()
            .map(RemoteRow::into_profile)
            .ok_or_else(|| RemoteError::not_found(identity))
    }

    async fn insert(&self, identity: &str, profile: &Profile) -> RemoteResult<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        self.check_writable()?;
        let mut rows = self.rows()?;
        if rows.iter().any(|r| r.username == identity) {
            return Err(RemoteError::Conflict(format!("username '{identity}' already exists")));
        }
        rows.push(RemoteRow::from_profile(identity, profile));
        Ok(())
    }

    async fn update(&self, identity: &str, patch: &ProfilePatch) -> RemoteResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        self.check_writable()?;
        let mut rows = self.rows()?;
        let row = rows
            .iter_mut()
            .find(|r| r.username == identity)
            .ok_or_else(|| RemoteError::not_found(identity))?;
        row.apply(patch);
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> RemoteResult<Vec<Profile>> {
        self.simulate_network().await?;
        let mut rows = self.rows()?.clone();
        // Stable sort keeps insertion order among equal scores.
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(RemoteRow::into_profile)
            .collect())
    }
}
