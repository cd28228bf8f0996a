//! Economy rules: every player action and the offline catch-up.

use cosmic_core::{
    bonus::{BonusWindow, MultiplierWindow},
    catalog::{VariantCatalog, DEFAULT_VARIANT},
    clock::reward_countdown,
    config::EconomyConfig,
    economy,
    error::Rejection,
    profile::{Profile, ProfilePatch},
    rng::{RngBank, SessionRng, StreamSlot},
};

fn fresh(now: i64) -> Profile {
    Profile::new_default("ada", now)
}

#[test]
fn catch_up_credits_floor_of_elapsed_regen_units() {
    let mut profile = fresh(0);
    profile.resource = 500.0;
    economy::catch_up(&mut profile, 9_000);
    assert_eq!(profile.resource, 503.0);
}

#[test]
fn catch_up_matches_closed_form_for_any_offline_duration() {
    let capacity = VariantCatalog::default_variant().resource_capacity;
    for stored in [0.0, 500.0, 995.0, 1000.0] {
        for d in [0i64, 1, 2_999, 3_000, 8_999, 9_000, 600_000, 86_400_000] {
            let mut profile = fresh(0);
            profile.resource = stored;
            economy::catch_up(&mut profile, d);
            let expected = (stored + (d / 3_000) as f64).min(capacity);
            assert_eq!(profile.resource, expected, "stored {stored}, offline {d}ms");
        }
    }
}

#[test]
fn tap_spends_energy_and_scores_by_variant_and_multiplier() {
    let cfg = EconomyConfig::default();
    let mut profile = fresh(0);

    let points = economy::tap(&mut profile, &MultiplierWindow::inactive(), 0, &cfg).unwrap();
    assert_eq!(points, 1);
    assert_eq!(profile.score, 1);
    assert_eq!(profile.resource, 999.0);

    let boost = MultiplierWindow::boosted(10, 5_000);
    assert_eq!(economy::tap(&mut profile, &boost, 5_000, &cfg).unwrap(), 10);
    // Lapsed window pays the base rate even before anything polls it.
    assert_eq!(economy::tap(&mut profile, &boost, 5_001, &cfg).unwrap(), 1);
    assert_eq!(profile.score, 12);
}

#[test]
fn tap_without_energy_is_rejected_and_changes_nothing() {
    let cfg = EconomyConfig::default();
    let mut profile = fresh(0);
    profile.resource = 0.5;
    profile.score = 42;
    let before = profile.clone();

    let result = economy::tap(&mut profile, &MultiplierWindow::inactive(), 0, &cfg);
    assert!(matches!(result, Err(Rejection::InsufficientResource { .. })));
    assert_eq!(profile, before);
}

#[test]
fn tap_never_drops_energy_below_zero_or_score_below_start() {
    let cfg = EconomyConfig::default();
    let mut profile = fresh(0);
    profile.resource = 3.0;
    let start_score = profile.score;
    for _ in 0..10 {
        let _ = economy::tap(&mut profile, &MultiplierWindow::inactive(), 0, &cfg);
        assert!(profile.resource >= 0.0);
        assert!(profile.score >= start_score);
    }
    assert_eq!(profile.resource, 0.0);
    assert_eq!(profile.score, 3);
}

#[test]
fn timed_reward_claims_once_per_cooldown() {
    let cfg = EconomyConfig::default();
    let mut rng = SessionRng::new(99);
    let mut profile = fresh(0);

    let first = economy::claim_timed_reward(&mut profile, 0, &cfg, &mut rng).unwrap();
    assert!((50..=500).contains(&first));
    assert_eq!(profile.score, first);
    assert_eq!(profile.last_timed_reward_at, Some(0));

    let denied = economy::claim_timed_reward(&mut profile, 1_000, &cfg, &mut rng);
    assert_eq!(denied, Err(Rejection::CooldownActive { remaining_ms: 3_599_000 }));
    assert_eq!(profile.score, first);

    let second = economy::claim_timed_reward(&mut profile, 3_600_001, &cfg, &mut rng).unwrap();
    assert!((50..=500).contains(&second));
    assert_eq!(profile.score, first + second);
    assert_eq!(profile.last_timed_reward_at, Some(3_600_001));
}

#[test]
fn purchase_deducts_cost_and_equips() {
    let mut profile = fresh(0);
    profile.score = 1_500;

    let variant = economy::purchase_variant(&mut profile, 1).unwrap();
    assert_eq!(variant.name, "Comet");
    assert_eq!(profile.score, 500);
    assert_eq!(profile.active_variant, 1);
    assert!(profile.owns(1));
    // Comet holds 500; energy is clamped down to fit.
    assert_eq!(profile.resource, 500.0);
}

#[test]
fn purchase_rejections_leave_profile_untouched() {
    let mut profile = fresh(0);
    profile.score = 999;
    let before = profile.clone();

    assert_eq!(
        economy::purchase_variant(&mut profile, 1),
        Err(Rejection::InsufficientScore { have: 999, need: 1_000 })
    );
    assert_eq!(
        economy::purchase_variant(&mut profile, DEFAULT_VARIANT),
        Err(Rejection::AlreadyOwned(DEFAULT_VARIANT))
    );
    assert_eq!(economy::purchase_variant(&mut profile, 77), Err(Rejection::UnknownVariant(77)));
    assert_eq!(profile, before);
}

#[test]
fn equip_requires_ownership_and_never_tops_up() {
    let mut profile = fresh(0);
    let before = profile.clone();
    assert_eq!(economy::equip_variant(&mut profile, 2), Err(Rejection::NotOwned(2)));
    assert_eq!(profile, before);

    profile.owned_variants.insert(2);
    profile.resource = 800.0;
    economy::equip_variant(&mut profile, 2).unwrap();
    assert_eq!(profile.active_variant, 2);
    assert_eq!(profile.resource_capacity(), 1_500.0);
    assert_eq!(profile.resource, 800.0);

    profile.owned_variants.insert(1);
    economy::equip_variant(&mut profile, 1).unwrap();
    assert_eq!(profile.resource, 500.0);
    economy::equip_variant(&mut profile, 2).unwrap();
    assert_eq!(profile.resource, 500.0);
}

#[test]
fn trigger_bonus_needs_an_armed_window() {
    let cfg = EconomyConfig::default();
    let mut rng = SessionRng::new(3);
    let mut bonus = BonusWindow::scheduled(0, &cfg, &mut rng);
    let mut multiplier = MultiplierWindow::inactive();

    assert_eq!(
        economy::trigger_bonus(&mut bonus, &mut multiplier, 0, &cfg, &mut rng),
        Err(Rejection::NoBonusArmed)
    );

    let spawn_at = bonus.next_deadline();
    assert!((20_000..=100_000).contains(&spawn_at));
    assert!(bonus.poll(spawn_at, &cfg, &mut rng).is_some());

    let window = economy::trigger_bonus(&mut bonus, &mut multiplier, spawn_at + 10, &cfg, &mut rng)
        .unwrap();
    assert_eq!(window.factor, 10);
    let duration = window.expires_at - (spawn_at + 10);
    assert!((5_000..=15_000).contains(&duration));
    assert!(!bonus.is_active());
}

#[test]
fn reset_returns_to_defaults() {
    let mut profile = fresh(0);
    profile.score = 90_000;
    profile.owned_variants.insert(3);
    profile.active_variant = 3;
    economy::reset_progress(&mut profile, 10);
    assert_eq!(profile, Profile::new_default("ada", 10));
}

#[test]
fn regen_units_floor_and_ignore_negative_spans() {
    assert_eq!(economy::regen_units(9_000, 3_000), 3);
    assert_eq!(economy::regen_units(8_999, 3_000), 2);
    assert_eq!(economy::regen_units(-5_000, 3_000), 0);
}

#[test]
fn extreme_foreign_timestamps_saturate() {
    let cfg = EconomyConfig::default();

    let mut profile = fresh(i64::MIN);
    profile.resource = 10.0;
    economy::catch_up(&mut profile, i64::MAX);
    assert_eq!(profile.resource, profile.resource_capacity());

    let mut profile = fresh(i64::MAX);
    profile.resource = 10.0;
    assert_eq!(economy::catch_up(&mut profile, i64::MIN), 0);
    assert_eq!(profile.resource, 10.0);

    profile.last_timed_reward_at = Some(i64::MIN);
    assert_eq!(economy::reward_cooldown_remaining(&profile, i64::MAX, &cfg), 0);
    profile.last_timed_reward_at = Some(i64::MAX);
    assert_eq!(economy::reward_cooldown_remaining(&profile, i64::MIN, &cfg), i64::MAX);

    assert_eq!(reward_countdown(i64::MAX, i64::MIN, cfg.reward_cooldown_ms), "");
    assert!(!reward_countdown(i64::MIN, i64::MAX, cfg.reward_cooldown_ms).is_empty());
}

#[test]
fn normalization_repairs_foreign_rows() {
    let mut p = fresh(0);
    p.owned_variants.clear();
    p.active_variant = 42;
    p.resource = 9_999.0;

    let p = p.normalized();
    assert!(p.owns(DEFAULT_VARIANT));
    assert_eq!(p.active_variant, DEFAULT_VARIANT);
    assert_eq!(p.resource, 1_000.0);
}

#[test]
fn patch_serializes_only_present_fields() {
    let patch = ProfilePatch { score: Some(7), ..Default::default() };
    let json = serde_json::to_value(&patch).expect("serialize");
    assert_eq!(json, serde_json::json!({ "score": 7 }));
}

#[test]
fn same_seed_same_stream() {
    let mut a = RngBank::new(7).stream(StreamSlot::TimedReward);
    let mut b = RngBank::new(7).stream(StreamSlot::TimedReward);
    for _ in 0..32 {
        assert_eq!(a.int_inclusive(50, 500), b.int_inclusive(50, 500));
    }
}

#[test]
fn random_draws_stay_in_range() {
    let mut rng = RngBank::new(99).stream(StreamSlot::BonusDelay);
    for _ in 0..1_000 {
        assert!((50..=500).contains(&rng.int_inclusive(50, 500)));
        assert!((20_000..100_000).contains(&rng.span_ms(20_000, 100_000)));
        assert!((10.0..90.0).contains(&rng.uniform(10.0, 90.0)));
    }
    let mut rng = RngBank::new(1).stream(StreamSlot::BonusDuration);
    assert_eq!(rng.int_inclusive(5, 5), 5);
    assert_eq!(rng.span_ms(8, 8), 8);
}
