//! Session timers driven by hand: clock tasks, the bonus spawner, the
//! multiplier window, and the countdown text.

use cosmic_core::{
    bonus::{BonusResolution, BonusTransition, BonusWindow, MultiplierWindow},
    clock::{reward_countdown, ManualClock, WallClock},
    config::{CoreConfig, EconomyConfig},
    error::Rejection,
    game::SessionState,
    profile::Profile,
    rng::SessionRng,
    tasks::{ClockTask, CountdownTask, MultiplierExpiryTask, RegenTask},
    types::Millis,
};
use std::time::Duration;

fn state_at(now: Millis) -> SessionState {
    let config = CoreConfig::default_test();
    let mut rng = SessionRng::new(5);
    let bonus = BonusWindow::scheduled(now, &config.economy, &mut rng);
    SessionState {
        profile: Profile::new_default("ada", now),
        multiplier: MultiplierWindow::inactive(),
        bonus,
        countdown: String::new(),
        regen_anchor: now,
        rng,
    }
}

// ── Clock tasks ──────────────────────────────────────────────────────────────

#[test]
fn regen_credits_whole_units_and_keeps_the_remainder() {
    let config = CoreConfig::default_test();
    let mut task = RegenTask::new(&config.sync);
    let mut state = state_at(0);
    state.profile.resource = 10.0;

    task.run(&mut state, 7_500);
    assert_eq!(state.profile.resource, 12.0);
    assert_eq!(state.regen_anchor, 6_000);

    task.run(&mut state, 9_000);
    assert_eq!(state.profile.resource, 13.0);
}

#[test]
fn regen_sleep_is_capped() {
    let config = CoreConfig::default_test();
    let mut task = RegenTask::new(&config.sync);
    let mut state = state_at(0);
    let sleep = task.run(&mut state, 0);
    assert!(sleep <= Duration::from_millis(config.sync.max_task_sleep_ms));
}

#[test]
fn countdown_blank_before_first_claim() {
    let config = CoreConfig::default_test();
    let mut task = CountdownTask::new(&config.economy, &config.sync);
    let mut state = state_at(0);
    task.run(&mut state, 1_000);
    assert_eq!(state.countdown, "");

    state.profile.last_timed_reward_at = Some(1_000);
    task.run(&mut state, 2_000);
    assert_eq!(state.countdown, "59:59");
}

#[test]
fn expiry_task_switches_off_a_lapsed_multiplier() {
    let config = CoreConfig::default_test();
    let mut task = MultiplierExpiryTask::new(&config.sync);
    let mut state = state_at(0);
    state.multiplier = MultiplierWindow::boosted(10, 5_000);
    task.run(&mut state, 5_000);
    assert_eq!(state.multiplier.factor, 10);
    task.run(&mut state, 5_001);
    assert_eq!(state.multiplier, MultiplierWindow::inactive());
}

// ── Bonus spawner ────────────────────────────────────────────────────────────

fn fixtures() -> (EconomyConfig, SessionRng) {
    (EconomyConfig::default(), SessionRng::new(11))
}

#[test]
fn spawn_arms_inside_the_play_area() {
    let (config, mut rng) = fixtures();
    let mut bonus = BonusWindow::scheduled(0, &config, &mut rng);
    let spawn_at = bonus.next_deadline();
    assert!((20_000..100_000).contains(&spawn_at));

    assert_eq!(bonus.poll(spawn_at - 1, &config, &mut rng), None);
    let Some(BonusTransition::Armed(pos)) = bonus.poll(spawn_at, &config, &mut rng) else {
        panic!("bonus should arm at its deadline");
    };
    assert!((10.0..90.0).contains(&pos.top_pct));
    assert!((10.0..90.0).contains(&pos.left_pct));
    assert_eq!(bonus.expires_at(), Some(spawn_at + 8_000));
}

#[test]
fn unclaimed_bonus_expires_and_reschedules() {
    let (config, mut rng) = fixtures();
    let mut bonus = BonusWindow::scheduled(0, &config, &mut rng);
    let spawn_at = bonus.next_deadline();
    bonus.poll(spawn_at, &config, &mut rng);

    let expiry = spawn_at + 8_000;
    assert_eq!(bonus.poll(expiry, &config, &mut rng), Some(BonusTransition::Expired));
    assert!(!bonus.is_active());
    assert_eq!(bonus.last_resolution(), Some(BonusResolution::Expired));
    assert!(bonus.next_deadline() >= expiry + 20_000);
}

#[test]
fn claim_requires_an_armed_window() {
    let (config, mut rng) = fixtures();
    let mut bonus = BonusWindow::scheduled(0, &config, &mut rng);
    assert_eq!(bonus.claim(0, &config, &mut rng), Err(Rejection::NoBonusArmed));

    let spawn_at = bonus.next_deadline();
    bonus.poll(spawn_at, &config, &mut rng);
    assert_eq!(bonus.claim(spawn_at + 1, &config, &mut rng), Ok(()));
    assert_eq!(bonus.last_resolution(), Some(BonusResolution::Claimed));
    assert!(!bonus.is_active());
}

#[test]
fn multiplier_switches_off_strictly_after_expiry() {
    let mut m = MultiplierWindow::boosted(10, 5_000);
    assert_eq!(m.factor_at(5_000), 10);
    assert!(!m.poll(5_000));
    assert_eq!(m.remaining_secs(4_001), 1);
    assert!(m.poll(5_001));
    assert_eq!(m, MultiplierWindow::inactive());
    assert_eq!(m.factor_at(5_001), 1);
}

// ── Countdown text ───────────────────────────────────────────────────────────

#[test]
fn countdown_formats_minutes_and_seconds() {
    assert_eq!(reward_countdown(1_000, 0, 3_600_000), "59:59");
    assert_eq!(reward_countdown(3_540_000, 0, 3_600_000), "1:00");
    assert_eq!(reward_countdown(3_599_500, 0, 3_600_000), "0:00");
    assert_eq!(reward_countdown(0, 0, 7_200_000), "2:00:00");
}

#[test]
fn countdown_is_empty_once_claimable() {
    assert_eq!(reward_countdown(3_600_000, 0, 3_600_000), "");
    assert_eq!(reward_countdown(10, 0, 0), "");
}

#[test]
fn manual_clock_advances() {
    let clock = ManualClock::new(100);
    assert_eq!(clock.advance(50), 150);
    assert_eq!(clock.now_ms(), 150);
}
