//! A running game session: one logged-in profile, its in-memory timers,
//! and the background tasks that drive them.
//!
//! RULES:
//!   - All mutable session state lives behind one mutex.
//!   - Every player action applies its transition and writes the cache
//!     while holding that mutex, so the two are never observed apart.
//!   - Purchases and equips also push immediately; everything else waits
//!     for the periodic sync.
//!   - Multiplier and bonus state are session-only and are not persisted.

use crate::{
    bonus::{BonusWindow, MultiplierWindow},
    catalog::Variant,
    economy,
    error::Rejection,
    profile::Profile,
    reconcile::{Leaderboard, LoginOutcome, ProfileSource, ReconciliationEngine, SyncMode},
    rng::SessionRng,
    scheduler::TaskScope,
    snapshot::SessionSnapshot,
    tasks::{BonusSpawnTask, ClockTask, CountdownTask, MultiplierExpiryTask, RegenTask, SyncTask},
    types::{Identity, Millis, VariantId},
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything a session mutates.
pub struct SessionState {
    pub profile:      Profile,
    pub multiplier:   MultiplierWindow,
    pub bonus:        BonusWindow,
    /// Rendered reward countdown, refreshed by the countdown task.
    pub countdown:    String,
    /// Wall-clock instant the current regen interval started.
    pub regen_anchor: Millis,
    pub rng:          SessionRng,
}

pub struct GameSession {
    engine:   Arc<ReconciliationEngine>,
    state:    Arc<Mutex<SessionState>>,
    identity: Identity,
    mode:     SyncMode,
    source:   ProfileSource,
    advisory: Option<String>,
    scope:    TaskScope,
}

impl GameSession {
    /// Start a session from a completed login. Offline regeneration is
    /// credited once, then the periodic tasks are spawned. Must be called
    /// from inside a tokio runtime.
    pub fn start(engine: Arc<ReconciliationEngine>, login: LoginOutcome, seed: u64) -> Self {
        let ctx = engine.context().clone();
        let now = ctx.now_ms();
        let config = &ctx.config;

        let mut profile = login.profile;
        let credited = economy::catch_up(&mut profile, now);
        if credited > 0 {
            log::info!("'{}': credited {credited} energy units for time away", profile.identity);
        }
        profile.last_synced_at = engine.persist_local(&profile);

        let mut rng = SessionRng::new(seed);
        let bonus = BonusWindow::scheduled(now, &config.economy, &mut rng);
        let identity = profile.identity.clone();
        let state = Arc::new(Mutex::new(SessionState {
            profile,
            multiplier: MultiplierWindow::inactive(),
            bonus,
            countdown: String::new(),
            regen_anchor: now,
            rng,
        }));

        let mut scope = TaskScope::new();
        let tasks: Vec<Box<dyn ClockTask>> = vec![
            Box::new(RegenTask::new(&config.sync)),
            Box::new(MultiplierExpiryTask::new(&config.sync)),
            Box::new(BonusSpawnTask::new(&config.economy, &config.sync)),
            Box::new(CountdownTask::new(&config.economy, &config.sync)),
            Box::new(SyncTask::new(Arc::clone(&engine), &config.sync, scope.signal())),
        ];
        for task in tasks {
            scope.spawn_clock_task(task, Arc::clone(&state), Arc::clone(&ctx.clock));
        }

        log::info!("session started for '{identity}' ({:?}, {:?})", login.mode, login.source);
        Self {
            engine,
            state,
            identity,
            mode: login.mode,
            source: login.source,
            advisory: login.advisory,
            scope,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn source(&self) -> ProfileSource {
        self.source
    }

    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    /// Names of background tasks still running.
    pub fn running_tasks(&self) -> Vec<&'static str> {
        self.scope.running()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `action` at the current wall-clock time and, on success,
    /// write the cache before releasing the state lock.
    fn act<T>(
        &self,
        push_now: bool,
        action: impl FnOnce(&mut SessionState, Millis) -> Result<T, Rejection>,
    ) -> Result<T, Rejection> {
        let now = self.engine.context().now_ms();
        let mut state = self.lock();
        let out = action(&mut state, now)?;
        state.profile.last_synced_at = self.engine.persist_local(&state.profile);
        if push_now {
            let _ = self.engine.push_in_background(&state.profile, self.scope.signal());
        }
        Ok(out)
    }

    /// Current profile, as held in memory.
    pub fn profile(&self) -> Profile {
        self.lock().profile.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.engine.context().now_ms();
        let state = self.lock();
        SessionSnapshot::capture(
            &state,
            now,
            self.mode,
            self.advisory.clone(),
            self.engine.last_push(),
        )
    }

    // ── Player actions ───────────────────────────────────────────────────────

    pub fn tap(&self) -> Result<u64, Rejection> {
        let rules = self.engine.context().config.economy.clone();
        self.act(false, |s, now| economy::tap(&mut s.profile, &s.multiplier, now, &rules))
    }

    pub fn claim_timed_reward(&self) -> Result<u64, Rejection> {
        let rules = self.engine.context().config.economy.clone();
        self.act(false, |s, now| {
            let SessionState { profile, rng, .. } = &mut *s;
            let reward = economy::claim_timed_reward(profile, now, &rules, rng)?;
            s.countdown = crate::clock::reward_countdown(now, now, rules.reward_cooldown_ms);
            Ok(reward)
        })
    }

    pub fn trigger_bonus(&self) -> Result<MultiplierWindow, Rejection> {
        let rules = self.engine.context().config.economy.clone();
        self.act(false, |s, now| {
            let SessionState { bonus, multiplier, rng, .. } = s;
            economy::trigger_bonus(bonus, multiplier, now, &rules, rng)
        })
    }

    pub fn purchase_variant(&self, id: VariantId) -> Result<&'static Variant, Rejection> {
        self.act(true, |s, _| economy::purchase_variant(&mut s.profile, id))
    }

    pub fn equip_variant(&self, id: VariantId) -> Result<&'static Variant, Rejection> {
        self.act(true, |s, _| economy::equip_variant(&mut s.profile, id))
    }

    /// Back to defaults under the same identity. Session timers restart.
    pub fn reset_progress(&self) {
        let rules = self.engine.context().config.economy.clone();
        let _ = self.act(true, |s, now| {
            economy::reset_progress(&mut s.profile, now);
            s.multiplier = MultiplierWindow::inactive();
            s.bonus = BonusWindow::scheduled(now, &rules, &mut s.rng);
            s.countdown.clear();
            s.regen_anchor = now;
            Ok::<(), Rejection>(())
        });
        log::info!("'{}': progress reset", self.identity);
    }

    /// Push current progress, wait for it, then read the rankings.
    pub async fn leaderboard(&self) -> Leaderboard {
        let profile = self.profile();
        self.engine.leaderboard(Some(&profile)).await
    }

    /// Stop every task, drop any push still in flight, and write the
    /// final state to the cache. Returns the profile as it was at the end.
    pub fn end(mut self) -> Profile {
        self.scope.cancel();
        let mut state = self.lock();
        state.profile.last_synced_at = self.engine.persist_local(&state.profile);
        let profile = state.profile.clone();
        drop(state);
        log::info!("session ended for '{}' (score {})", self.identity, profile.score);
        profile
    }
}
