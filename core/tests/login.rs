//! Login protocol: server-authoritative overwrite, creation, and the
//! offline fallback.

mod common;

use common::{harness, T0};
use cosmic_core::{
    catalog::DEFAULT_VARIANT,
    error::{CoreError, RemoteError},
    game::GameSession,
    profile::Profile,
    reconcile::{ProfileSource, SyncMode, OFFLINE_ADVISORY},
    remote::RemoteRow,
};

fn profile(identity: &str, score: u64, resource: f64, at: i64) -> Profile {
    let mut p = Profile::new_default(identity, at);
    p.score = score;
    p.resource = resource;
    p
}

#[tokio::test]
async fn remote_profile_overwrites_divergent_cache() {
    let h = harness();
    let mut remote = profile("ada", 700, 320.0, T0 - 60_000);
    remote.owned_variants.insert(1);
    remote.active_variant = 1;
    h.remote.seed(&remote);
    h.ctx.cache.write("ada", &profile("ada", 9_999, 10.0, T0));

    let outcome = h.engine().login("ada").await.expect("login");

    assert_eq!(outcome.mode, SyncMode::Online);
    assert_eq!(outcome.source, ProfileSource::Remote);
    assert_eq!(outcome.advisory, None);
    assert_eq!(outcome.profile, remote);

    let cached = h.ctx.cache.read("ada").expect("cached");
    assert_eq!(cached.score, 700);
    assert_eq!(cached.active_variant, 1);
    assert_eq!(cached.last_synced_at, T0);
}

#[tokio::test]
async fn unknown_identity_gets_defaults_and_a_remote_row() {
    let h = harness();

    let outcome = h.engine().login("newcomer").await.expect("login");

    assert_eq!(outcome.mode, SyncMode::Online);
    assert_eq!(outcome.source, ProfileSource::Created);
    let p = &outcome.profile;
    assert_eq!(p.score, 0);
    assert_eq!(p.resource, p.resource_capacity());
    assert_eq!(p.owned_variants.iter().copied().collect::<Vec<_>>(), vec![DEFAULT_VARIANT]);
    assert_eq!(p.active_variant, DEFAULT_VARIANT);

    let row = h.remote.row("newcomer").expect("row created");
    assert_eq!(row.score, 0);
    assert!(h.ctx.cache.read("newcomer").is_some());
}

#[tokio::test]
async fn missing_remote_row_is_seeded_from_the_cache() {
    let h = harness();
    h.ctx.cache.write("ada", &profile("ada", 4_200, 77.0, T0));

    let outcome = h.engine().login("ada").await.expect("login");

    assert_eq!(outcome.source, ProfileSource::Created);
    assert_eq!(outcome.profile.score, 4_200);
    let row = h.remote.row("ada").expect("row created");
    assert_eq!(row.score, 4_200);
    assert_eq!(row.energy, 77.0);
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_cache_with_advisory() {
    let h = harness();
    h.ctx.cache.write("ada", &profile("ada", 310, 640.0, T0));
    h.remote.set_offline(true);

    let outcome = h.engine().login("ada").await.expect("login");

    assert_eq!(outcome.mode, SyncMode::Offline);
    assert_eq!(outcome.source, ProfileSource::Cache);
    assert_eq!(outcome.advisory.as_deref(), Some(OFFLINE_ADVISORY));
    assert_eq!(outcome.profile.score, 310);
    assert_eq!(h.remote.insert_count(), 0);
}

#[tokio::test]
async fn unreachable_remote_without_cache_plays_on_cached_defaults() {
    let h = harness();
    h.remote.set_offline(true);

    let outcome = h.engine().login("ada").await.expect("login");

    assert_eq!(outcome.mode, SyncMode::Offline);
    assert_eq!(outcome.source, ProfileSource::Defaults);
    assert!(outcome.advisory.is_some());
    assert_eq!(outcome.profile.score, 0);
    let cached = h.ctx.cache.read("ada").expect("defaults cached");
    assert_eq!(cached.score, 0);
}

#[tokio::test]
async fn rejected_insert_degrades_to_offline() {
    let h = harness();
    h.remote.set_deny_writes(true);

    let outcome = h.engine().login("ada").await.expect("login");

    assert_eq!(outcome.mode, SyncMode::Offline);
    assert_eq!(outcome.source, ProfileSource::Defaults);
    assert!(h.remote.row("ada").is_none());
    assert_eq!(h.remote.insert_count(), 1);
}

#[tokio::test]
async fn blank_identity_is_rejected_and_names_are_trimmed() {
    let h = harness();
    let engine = h.engine();

    let err = engine.login("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidIdentity(_)));
    assert_eq!(h.remote.fetch_count(), 0);

    let outcome = engine.login("  ada \n").await.expect("login");
    assert_eq!(outcome.profile.identity, "ada");
    assert_eq!(h.ctx.session.current_identity().as_deref(), Some("ada"));
}

#[tokio::test]
async fn logout_forgets_identity_but_keeps_progress() {
    let h = harness();
    let engine = h.engine();
    engine.login("ada").await.expect("login");

    let resumed = engine.resume().await.expect("resume").expect("bound");
    assert_eq!(resumed.profile.identity, "ada");

    engine.logout();
    assert_eq!(h.ctx.session.current_identity(), None);
    assert!(engine.resume().await.expect("resume").is_none());
    assert!(h.ctx.cache.read("ada").is_some());
    assert!(h.remote.row("ada").is_some());
}

#[tokio::test(start_paused = true)]
async fn unstamped_remote_row_credits_no_time_away() {
    for stamp in [serde_json::Value::Null, serde_json::json!(0)] {
        let h = harness();
        let mut raw = serde_json::json!({ "username": "zed", "score": 5, "energy": 100.0 });
        if !stamp.is_null() {
            raw["last_updated"] = stamp;
        }
        let row: RemoteRow = serde_json::from_value(raw).expect("row");
        h.remote.seed_row(row);
        let engine = h.engine();

        let outcome = engine.login("zed").await.expect("login");
        assert_eq!(outcome.source, ProfileSource::Remote);
        assert_eq!(outcome.profile.last_synced_at, T0);

        let session = GameSession::start(engine, outcome, 1);
        assert_eq!(session.profile().resource, 100.0);
        assert_eq!(session.profile().score, 5);
        session.end();
    }
}

#[test]
fn absent_variant_columns_decode_to_the_default_variant() {
    let row: RemoteRow = serde_json::from_value(serde_json::json!({
        "username": "vega",
        "score": 120,
        "energy": 640.0,
        "last_updated": T0,
    }))
    .expect("row");
    assert_eq!(row.last_updated, Some(T0));

    let profile = row.into_profile();
    assert_eq!(profile.owned_variants.len(), 1);
    assert!(profile.owns(DEFAULT_VARIANT));
    assert_eq!(profile.active_variant, DEFAULT_VARIANT);
    assert_eq!(profile.last_timed_reward_at, None);
    assert_eq!(profile.last_synced_at, T0);
}

#[test]
fn http_status_maps_onto_remote_errors() {
    assert!(matches!(RemoteError::from_status(401, "x"), RemoteError::Permission(_)));
    assert!(matches!(RemoteError::from_status(403, "x"), RemoteError::Permission(_)));
    assert!(matches!(RemoteError::from_status(409, "x"), RemoteError::Conflict(_)));
    assert!(RemoteError::from_status(503, "x").is_connection());
    assert!(RemoteError::from_status(404, "ana").is_not_found());
    assert!(matches!(
        RemoteError::from_status(400, "x"),
        RemoteError::Api { status: 400, .. }
    ));
}
