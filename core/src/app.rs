//! ClickerApp: the single entry point a front end drives.
//!
//! RULE: At most one GameSession is live. Logging in as anyone ends the
//! current session first, so two profiles never share timers.

use crate::{
    catalog::{Variant, VariantCatalog},
    command::PlayerCommand,
    context::CoreContext,
    error::{CoreError, CoreResult, Rejection},
    game::GameSession,
    profile::Profile,
    reconcile::{normalize_identity, Leaderboard, LoginOutcome, ProfileSource, ReconciliationEngine},
    snapshot::SessionSnapshot,
    types::VariantId,
};
use serde::Serialize;
use std::sync::Arc;

/// What a command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Session { source: ProfileSource, snapshot: SessionSnapshot },
    NoSession,
    LoggedOut { score: u64 },
    Tapped { taps: u32, points: u64, snapshot: SessionSnapshot },
    Rewarded { amount: u64, snapshot: SessionSnapshot },
    BonusClaimed { factor: u64, expires_at: i64, snapshot: SessionSnapshot },
    Purchased { variant: VariantId, name: &'static str, snapshot: SessionSnapshot },
    Equipped { variant: VariantId, name: &'static str, snapshot: SessionSnapshot },
    Reset { snapshot: SessionSnapshot },
    State { snapshot: SessionSnapshot },
    Leaderboard { leaderboard: Leaderboard },
    Catalog { variants: Vec<Variant> },
    Rejected { reason: String, snapshot: SessionSnapshot },
}

pub struct ClickerApp {
    engine:           Arc<ReconciliationEngine>,
    session:          Option<GameSession>,
    seed:             u64,
    sessions_started: u64,
}

impl ClickerApp {
    pub fn new(ctx: CoreContext, seed: u64) -> Self {
        Self {
            engine: Arc::new(ReconciliationEngine::new(ctx)),
            session: None,
            seed,
            sessions_started: 0,
        }
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    fn start_session(&mut self, outcome: LoginOutcome) -> &GameSession {
        // Each session gets its own streams.
        let seed = self.seed.wrapping_add(self.sessions_started);
        self.sessions_started += 1;
        self.session.insert(GameSession::start(Arc::clone(&self.engine), outcome, seed))
    }

    fn end_session(&mut self) -> Option<Profile> {
        self.session.take().map(GameSession::end)
    }

    /// Log in as `identity`, ending any current session first.
    pub async fn login(&mut self, identity: &str) -> CoreResult<&GameSession> {
        let identity = normalize_identity(identity)?;
        self.end_session();
        let outcome = self.engine.login(&identity).await?;
        Ok(self.start_session(outcome))
    }

    /// Restore the session remembered from the last run, if any.
    pub async fn resume(&mut self) -> CoreResult<Option<&GameSession>> {
        self.end_session();
        match self.engine.resume().await? {
            Some(outcome) => Ok(Some(self.start_session(outcome))),
            None => Ok(None),
        }
    }

    /// End the session but remember the identity for the next resume.
    pub fn close(&mut self) -> Option<Profile> {
        self.end_session()
    }

    /// End the session and forget the identity. Returns the final profile.
    pub fn logout(&mut self) -> Option<Profile> {
        let last = self.end_session();
        self.engine.logout();
        last
    }

    fn live(&self) -> CoreResult<&GameSession> {
        self.session.as_ref().ok_or(CoreError::NoSession)
    }

    pub async fn execute(&mut self, command: PlayerCommand) -> CoreResult<CommandReply> {
        match command {
            PlayerCommand::Login { identity } => {
                let session = self.login(&identity).await?;
                Ok(CommandReply::Session {
                    source:   session.source(),
                    snapshot: session.snapshot(),
                })
            }
            PlayerCommand::Resume => Ok(match self.resume().await? {
                Some(session) => CommandReply::Session {
                    source:   session.source(),
                    snapshot: session.snapshot(),
                },
                None => CommandReply::NoSession,
            }),
            PlayerCommand::Logout => {
                let profile = self.logout().ok_or(CoreError::NoSession)?;
                Ok(CommandReply::LoggedOut { score: profile.score })
            }
            PlayerCommand::State => Ok(CommandReply::State {
                snapshot: self.live()?.snapshot(),
            }),
            PlayerCommand::Tap { count } => {
                let session = self.live()?;
                let mut points = 0;
                let mut taps = 0;
                for _ in 0..count {
                    match session.tap() {
                        Ok(earned) => {
                            points += earned;
                            taps += 1;
                        }
                        Err(rejection) if taps == 0 => return Ok(rejected(session, rejection)),
                        Err(_) => break,
                    }
                }
                Ok(CommandReply::Tapped { taps, points, snapshot: session.snapshot() })
            }
            PlayerCommand::ClaimReward => {
                let session = self.live()?;
                Ok(match session.claim_timed_reward() {
                    Ok(amount) => CommandReply::Rewarded { amount, snapshot: session.snapshot() },
                    Err(rejection) => rejected(session, rejection),
                })
            }
            PlayerCommand::TriggerBonus => {
                let session = self.live()?;
                Ok(match session.trigger_bonus() {
                    Ok(window) => CommandReply::BonusClaimed {
                        factor:     window.factor,
                        expires_at: window.expires_at,
                        snapshot:   session.snapshot(),
                    },
                    Err(rejection) => rejected(session, rejection),
                })
            }
            PlayerCommand::Purchase { variant } => {
                let session = self.live()?;
                Ok(match session.purchase_variant(variant) {
                    Ok(v) => CommandReply::Purchased {
                        variant:  v.id,
                        name:     v.name,
                        snapshot: session.snapshot(),
                    },
                    Err(rejection) => rejected(session, rejection),
                })
            }
            PlayerCommand::Equip { variant } => {
                let session = self.live()?;
                Ok(match session.equip_variant(variant) {
                    Ok(v) => CommandReply::Equipped {
                        variant:  v.id,
                        name:     v.name,
                        snapshot: session.snapshot(),
                    },
                    Err(rejection) => rejected(session, rejection),
                })
            }
            PlayerCommand::Reset => {
                let session = self.live()?;
                session.reset_progress();
                Ok(CommandReply::Reset { snapshot: session.snapshot() })
            }
            PlayerCommand::Leaderboard => {
                let leaderboard = match &self.session {
                    Some(session) => session.leaderboard().await,
                    None => self.engine.leaderboard(None).await,
                };
                Ok(CommandReply::Leaderboard { leaderboard })
            }
            PlayerCommand::Catalog => Ok(CommandReply::Catalog {
                variants: VariantCatalog::all().to_vec(),
            }),
        }
    }
}

fn rejected(session: &GameSession, rejection: Rejection) -> CommandReply {
    log::debug!("'{}': action rejected: {rejection}", session.identity());
    CommandReply::Rejected {
        reason:   rejection.to_string(),
        snapshot: session.snapshot(),
    }
}
