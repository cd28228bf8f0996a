//! The reconciliation engine: login against the authoritative store and
//! the steady-state push of local progress.
//!
//! LOGIN PROTOCOL:
//!   Idle → Fetching → { Authoritative | Creating | OfflineFallback } → Ready
//!
//!   Authoritative   remote row found; it overwrites the cache unconditionally.
//!   Creating        no remote row; seed one from the cache (or defaults).
//!   OfflineFallback remote unreachable or rejected us; play from the cache.
//!
//! RULES:
//!   - The cache is written first, synchronously, on every persist.
//!   - Remote pushes are fire-and-forget. Nothing in gameplay awaits them.
//!   - A failed push is logged and superseded by the next one. There is
//!     no queue and no retry.
//!   - Background pushes belong to the session that issued them and are
//!     dropped, mid-flight if need be, once its scope is cancelled.
//!   - Remote updates replace fields wholesale (last write wins).

use crate::{
    context::CoreContext,
    error::{CoreError, CoreResult, RemoteError, RemoteResult},
    profile::{Profile, ProfilePatch},
    types::{Identity, Millis},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const OFFLINE_ADVISORY: &str =
    "Playing offline: progress is saved on this device and syncs when the connection returns.";
pub const LEADERBOARD_OFFLINE_ADVISORY: &str = "Leaderboard unavailable in offline mode.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Idle,
    Fetching,
    Authoritative,
    Creating,
    OfflineFallback,
    Ready,
}

/// Where the profile handed back by a login came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Remote,
    Created,
    Cache,
    Defaults,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub profile:  Profile,
    pub mode:     SyncMode,
    pub source:   ProfileSource,
    /// Non-fatal notice for the player (set in offline mode).
    pub advisory: Option<String>,
}

/// One outstanding push of progress to the remote store.
#[derive(Debug, Clone)]
pub struct SyncTick {
    pub id:        Uuid,
    pub identity:  Identity,
    pub patch:     ProfilePatch,
    pub issued_at: Millis,
}

/// Result of the most recent push, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushRecord {
    pub tick_id:   String,
    pub issued_at: Millis,
    pub ok:        bool,
    pub error:     Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSource {
    Remote,
    LocalCache,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank:     usize,
    pub identity: Identity,
    pub score:    u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub rows:     Vec<LeaderboardRow>,
    pub source:   LeaderboardSource,
    pub advisory: Option<String>,
}

impl Leaderboard {
    fn from_profiles(profiles: Vec<Profile>, source: LeaderboardSource) -> Self {
        let rows = profiles
            .into_iter()
            .enumerate()
            .map(|(i, p)| LeaderboardRow {
                rank:     i + 1,
                identity: p.identity,
                score:    p.score,
            })
            .collect();
        let advisory = match source {
            LeaderboardSource::Remote => None,
            LeaderboardSource::LocalCache => Some(LEADERBOARD_OFFLINE_ADVISORY.to_string()),
        };
        Self { rows, source, advisory }
    }

    pub fn rank_of(&self, identity: &str) -> Option<usize> {
        self.rows.iter().find(|r| r.identity == identity).map(|r| r.rank)
    }
}

/// Trim and validate a login name.
pub fn normalize_identity(raw: &str) -> CoreResult<Identity> {
    let identity = raw.trim();
    if identity.is_empty() {
        return Err(CoreError::InvalidIdentity(raw.to_string()));
    }
    Ok(identity.to_string())
}

pub struct ReconciliationEngine {
    ctx:       CoreContext,
    last_push: Arc<Mutex<Option<PushRecord>>>,
}

impl ReconciliationEngine {
    pub fn new(ctx: CoreContext) -> Self {
        Self {
            ctx,
            last_push: Arc::new(Mutex::new(None)),
        }
    }

    pub fn context(&self) -> &CoreContext {
        &self.ctx
    }

    fn advance(identity: &str, phase: &mut LoginPhase, next: LoginPhase) {
        log::debug!("login '{identity}': {phase:?} -> {next:?}");
        *phase = next;
    }

    /// Run the login protocol for `raw_identity` and bind the session.
    /// Only an empty identity is an error; every remote failure degrades
    /// to offline mode.
    pub async fn login(&self, raw_identity: &str) -> CoreResult<LoginOutcome> {
        let identity = normalize_identity(raw_identity)?;
        let mut phase = LoginPhase::Idle;

        // Kept aside; only becomes authoritative if the remote cannot be used.
        let cached = self.ctx.cache.read(&identity);

        Self::advance(&identity, &mut phase, LoginPhase::Fetching);
        let failure = match self.ctx.remote.fetch(&identity).await {
            Ok(mut remote) => {
                Self::advance(&identity, &mut phase, LoginPhase::Authoritative);
                if remote.last_synced_at <= 0 {
                    // Unstamped row: nothing to credit for time away.
                    remote.last_synced_at = self.ctx.now_ms();
                }
                self.ctx.cache.write(&identity, &remote);
                log::info!("login '{identity}': remote profile is authoritative (score {})", remote.score);
                return Ok(self.ready(&identity, &mut phase, LoginOutcome {
                    profile:  remote,
                    mode:     SyncMode::Online,
                    source:   ProfileSource::Remote,
                    advisory: None,
                }));
            }
            Err(RemoteError::NotFound { .. }) => {
                Self::advance(&identity, &mut phase, LoginPhase::Creating);
                let seed = cached
                    .clone()
                    .unwrap_or_else(|| Profile::new_default(identity.clone(), self.ctx.now_ms()));
                match self.ctx.remote.insert(&identity, &seed).await {
                    Ok(()) => {
                        self.ctx.cache.write(&identity, &seed);
                        log::info!("login '{identity}': created remote profile");
                        return Ok(self.ready(&identity, &mut phase, LoginOutcome {
                            profile:  seed,
                            mode:     SyncMode::Online,
                            source:   ProfileSource::Created,
                            advisory: None,
                        }));
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        Self::advance(&identity, &mut phase, LoginPhase::OfflineFallback);
        log::warn!("login '{identity}': remote unavailable ({failure}); continuing offline");
        let (profile, source) = match cached {
            Some(profile) => (profile, ProfileSource::Cache),
            None => {
                let profile = Profile::new_default(identity.clone(), self.ctx.now_ms());
                self.ctx.cache.write(&identity, &profile);
                (profile, ProfileSource::Defaults)
            }
        };
        Ok(self.ready(&identity, &mut phase, LoginOutcome {
            profile,
            mode: SyncMode::Offline,
            source,
            advisory: Some(OFFLINE_ADVISORY.to_string()),
        }))
    }

    fn ready(&self, identity: &str, phase: &mut LoginPhase, outcome: LoginOutcome) -> LoginOutcome {
        self.ctx.session.bind(identity);
        Self::advance(identity, phase, LoginPhase::Ready);
        outcome
    }

    /// Re-run the login protocol for the identity remembered by the
    /// session manager, if there is one.
    pub async fn resume(&self) -> CoreResult<Option<LoginOutcome>> {
        match self.ctx.session.current_identity() {
            Some(identity) => Ok(Some(self.login(&identity).await?)),
            None => Ok(None),
        }
    }

    /// Forget the current identity. The cache and the remote row stay.
    pub fn logout(&self) {
        self.ctx.session.clear();
    }

    /// Write `profile` to the local cache. Returns the stamp.
    pub fn persist_local(&self, profile: &Profile) -> Millis {
        self.ctx.cache.write(&profile.identity, profile)
    }

    fn make_tick(&self, profile: &Profile) -> SyncTick {
        let issued_at = self.ctx.now_ms();
        SyncTick {
            id: Uuid::new_v4(),
            identity: profile.identity.clone(),
            patch: profile.progress_patch(issued_at),
            issued_at,
        }
    }

    /// One steady-state sync: cache write now, remote push in the
    /// background. The returned handle may be dropped.
    pub fn sync_tick(&self, profile: &Profile, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        self.persist_local(profile);
        self.push_in_background(profile, cancel)
    }

    /// Fire-and-forget remote push of `profile`. The push is abandoned
    /// as soon as `cancel` turns true or its sender goes away.
    pub fn push_in_background(
        &self,
        profile: &Profile,
        mut cancel: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let tick = self.make_tick(profile);
        let profile = profile.clone();
        let ctx = self.ctx.clone();
        let last_push = Arc::clone(&self.last_push);
        tokio::spawn(async move {
            let cancelled = async move {
                let _ = cancel.wait_for(|cancelled| *cancelled).await;
            };
            tokio::select! {
                biased;
                _ = cancelled => {
                    log::debug!("sync {} for '{}' dropped with its session", tick.id, tick.identity);
                }
                result = deliver(&ctx, &tick, &profile) => record(&last_push, &tick, &result),
            }
        })
    }

    /// Push `profile` and wait for the outcome.
    pub async fn push(&self, profile: &Profile) -> RemoteResult<()> {
        let tick = self.make_tick(profile);
        let result = deliver(&self.ctx, &tick, profile).await;
        record(&self.last_push, &tick, &result);
        result
    }

    pub fn last_push(&self) -> Option<PushRecord> {
        self.last_push.lock().ok().and_then(|p| p.clone())
    }

    /// Rankings for the leaderboard view. When `own` is given, the
    /// viewer's latest progress is cached and pushed first so their own
    /// row is current. Falls back to cached profiles if the remote
    /// ranking cannot be read.
    pub async fn leaderboard(&self, own: Option<&Profile>) -> Leaderboard {
        if let Some(profile) = own {
            self.persist_local(profile);
            if let Err(e) = self.push(profile).await {
                log::debug!("pre-leaderboard push failed: {e}");
            }
        }
        let limit = self.ctx.config.sync.leaderboard_limit;
        match self.ctx.remote.top_scores(limit).await {
            Ok(profiles) => Leaderboard::from_profiles(profiles, LeaderboardSource::Remote),
            Err(e) => {
                log::warn!("leaderboard fetch failed ({e}); showing cached profiles");
                Leaderboard::from_profiles(
                    self.ctx.cache.top_scores(limit),
                    LeaderboardSource::LocalCache,
                )
            }
        }
    }
}

/// Send one tick. A row missing upstream (a profile first created while
/// offline) is inserted whole instead of patched.
async fn deliver(ctx: &CoreContext, tick: &SyncTick, profile: &Profile) -> RemoteResult<()> {
    match ctx.remote.update(&tick.identity, &tick.patch).await {
        Err(RemoteError::NotFound { .. }) => {
            let mut full = profile.clone();
            full.last_synced_at = tick.issued_at;
            log::info!("sync {}: no remote row for '{}', inserting", tick.id, tick.identity);
            ctx.remote.insert(&tick.identity, &full).await
        }
        other => other,
    }
}

fn record(last_push: &Mutex<Option<PushRecord>>, tick: &SyncTick, result: &RemoteResult<()>) {
    match result {
        Ok(()) => log::debug!("sync {} for '{}' delivered", tick.id, tick.identity),
        Err(RemoteError::Permission(msg)) => {
            log::warn!("sync {} for '{}' rejected by remote policy, dropped: {msg}", tick.id, tick.identity)
        }
        Err(e) => log::warn!("sync {} for '{}' failed: {e}", tick.id, tick.identity),
    }
    if let Ok(mut slot) = last_push.lock() {
        *slot = Some(PushRecord {
            tick_id:   tick.id.to_string(),
            issued_at: tick.issued_at,
            ok:        result.is_ok(),
            error:     result.as_ref().err().map(|e| e.to_string()),
        });
    }
}
