//! Exactly the tier's hourly limit succeeds, with monotonically decreasing
//! `remaining`; the next request over the limit is denied with a bounded
//! `Retry-After`.

use kotadb::config::Config;
use kotadb::error::KotaError;
use kotadb::models::Tier;
use kotadb::rate_limit::check_and_increment;
use kotadb::store::{Store, StoreOptions};
use tempfile::tempdir;

#[test]
fn free_tier_denies_the_request_past_its_hourly_limit() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("kotadb.db"), StoreOptions::default()).unwrap();
    let config = Config::default();
    let limit = config.rate_limit_for(Tier::Free).hourly;

    let mut last_remaining = limit + 1;
    for _ in 0..limit {
        let headers = check_and_increment(&store, &config, "test-key", Tier::Free).unwrap();
        assert!(headers.remaining < last_remaining);
        last_remaining = headers.remaining;
    }
    assert_eq!(last_remaining, 0);

    match check_and_increment(&store, &config, "test-key", Tier::Free) {
        Err(KotaError::RateLimited { retry_after_secs }) => {
            assert!(retry_after_secs >= 1 && retry_after_secs <= 3600);
        }
        other => panic!("expected a rate-limit denial, got {other:?}"),
    }
}

#[test]
fn the_more_restrictive_of_hourly_and_daily_governs_remaining() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("kotadb.db"), StoreOptions::default()).unwrap();
    let mut config = Config::default();
    config.rate_limit_tiers.insert(
        Tier::Free,
        kotadb::config::RateLimitPolicy { hourly: 1_000, daily: 3 },
    );

    let mut last_remaining = u64::MAX;
    for _ in 0..3 {
        let headers = check_and_increment(&store, &config, "daily-key", Tier::Free).unwrap();
        assert!(headers.remaining < last_remaining);
        last_remaining = headers.remaining;
    }
    assert_eq!(last_remaining, 0);

    match check_and_increment(&store, &config, "daily-key", Tier::Free) {
        Err(KotaError::RateLimited { retry_after_secs }) => {
            assert!(retry_after_secs >= 1);
        }
        other => panic!("expected the daily limit to deny the request, got {other:?}"),
    }
}

#[test]
fn distinct_keys_have_independent_counters() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("kotadb.db"), StoreOptions::default()).unwrap();
    let config = Config::default();

    let a = check_and_increment(&store, &config, "key-a", Tier::Free).unwrap();
    let b = check_and_increment(&store, &config, "key-b", Tier::Free).unwrap();
    assert_eq!(a.remaining, b.remaining);
}
