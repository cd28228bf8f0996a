//! Economy model: the state transitions behind every player action and
//! every regeneration tick.
//!
//! RULES:
//!   - Every function here is synchronous and side-effect free beyond the
//!     values it is handed.
//!   - A rejected action leaves every argument exactly as it was.
//!   - Energy never leaves [0, capacity of the active variant].
//!   - Score only goes down by the exact cost of a purchase.

use crate::{
    bonus::{BonusWindow, MultiplierWindow},
    catalog::{Variant, VariantCatalog},
    config::EconomyConfig,
    error::Rejection,
    profile::Profile,
    rng::SessionRng,
    types::{Millis, VariantId},
};

/// Whole regeneration units earned over `elapsed_ms`. Negative spans
/// (a clock that moved backwards) earn nothing.
pub fn regen_units(elapsed_ms: Millis, regen_ms: Millis) -> u64 {
    if elapsed_ms <= 0 || regen_ms <= 0 {
        return 0;
    }
    (elapsed_ms / regen_ms) as u64
}

/// Add `units` of energy, clamped at capacity.
pub fn regenerate(profile: &mut Profile, units: u64) {
    if units == 0 {
        return;
    }
    let capacity = profile.resource_capacity();
    profile.resource = (profile.resource + units as f64).min(capacity);
}

/// Credit the energy regenerated while the client was not running:
/// `floor((now - last_synced_at) / regen_ms)` units, applied once.
/// Returns the number of units credited before clamping.
pub fn catch_up(profile: &mut Profile, now: Millis) -> u64 {
    let elapsed = now.saturating_sub(profile.last_synced_at);
    let units = regen_units(elapsed, profile.variant().regen_ms());
    regenerate(profile, units);
    units
}

/// One tap. Returns the points earned.
pub fn tap(
    profile: &mut Profile,
    multiplier: &MultiplierWindow,
    now: Millis,
    config: &EconomyConfig,
) -> Result<u64, Rejection> {
    if profile.resource < config.tap_cost {
        return Err(Rejection::InsufficientResource {
            have: profile.resource,
            need: config.tap_cost,
        });
    }
    let points = profile.variant().score_multiplier * multiplier.factor_at(now);
    profile.score = profile.score.saturating_add(points);
    profile.resource = (profile.resource - config.tap_cost).max(0.0);
    Ok(points)
}

/// Milliseconds until the timed reward can be claimed again. Zero when
/// it is claimable now.
pub fn reward_cooldown_remaining(profile: &Profile, now: Millis, config: &EconomyConfig) -> Millis {
    match profile.last_timed_reward_at {
        None => 0,
        Some(at) => config
            .reward_cooldown_ms
            .saturating_sub(now.saturating_sub(at))
            .max(0),
    }
}

/// Claim the timed reward. Returns the amount credited.
pub fn claim_timed_reward(
    profile: &mut Profile,
    now: Millis,
    config: &EconomyConfig,
    rng: &mut SessionRng,
) -> Result<u64, Rejection> {
    let remaining_ms = reward_cooldown_remaining(profile, now, config);
    if remaining_ms > 0 {
        return Err(Rejection::CooldownActive { remaining_ms });
    }
    let reward = rng.reward.int_inclusive(config.reward_min, config.reward_max);
    profile.score = profile.score.saturating_add(reward);
    profile.last_timed_reward_at = Some(now);
    Ok(reward)
}

/// Claim the armed bonus: the window closes and the multiplier is boosted
/// for a random duration. Returns the new multiplier.
pub fn trigger_bonus(
    bonus: &mut BonusWindow,
    multiplier: &mut MultiplierWindow,
    now: Millis,
    config: &EconomyConfig,
    rng: &mut SessionRng,
) -> Result<MultiplierWindow, Rejection> {
    bonus.claim(now, config, rng)?;
    let duration = rng
        .duration
        .span_ms(config.bonus_duration_min_ms, config.bonus_duration_max_ms);
    *multiplier = MultiplierWindow::boosted(config.bonus_factor, now + duration);
    Ok(*multiplier)
}

/// Buy a variant and equip it.
pub fn purchase_variant(profile: &mut Profile, id: VariantId) -> Result<&'static Variant, Rejection> {
    let variant = VariantCatalog::get(id).ok_or(Rejection::UnknownVariant(id))?;
    if profile.owns(id) {
        return Err(Rejection::AlreadyOwned(id));
    }
    if profile.score < variant.cost {
        return Err(Rejection::InsufficientScore {
            have: profile.score,
            need: variant.cost,
        });
    }
    profile.score -= variant.cost;
    profile.owned_variants.insert(id);
    equip(profile, variant);
    Ok(variant)
}

/// Switch to an owned variant. Energy is clamped down to the new
/// capacity, never topped up.
pub fn equip_variant(profile: &mut Profile, id: VariantId) -> Result<&'static Variant, Rejection> {
    if !profile.owns(id) {
        return Err(Rejection::NotOwned(id));
    }
    let variant = VariantCatalog::get(id).ok_or(Rejection::UnknownVariant(id))?;
    equip(profile, variant);
    Ok(variant)
}

fn equip(profile: &mut Profile, variant: &Variant) {
    profile.active_variant = variant.id;
    profile.resource = profile.resource.min(variant.resource_capacity);
}

/// Explicit reset: back to defaults under the same identity. The only
/// path that removes owned variants.
pub fn reset_progress(profile: &mut Profile, now: Millis) {
    *profile = Profile::new_default(profile.identity.clone(), now);
}
