//! Rate limiting: per-key hourly and daily counters, both enforced against
//! the authenticated tier's policy. Counter increments go through
//! `immediate_transaction` since every request on a busy key contends for
//! the same row.

use crate::config::Config;
use crate::error::{KotaError, Result};
use crate::models::Tier;
use crate::store::Store;
use chrono::{DateTime, Timelike, Utc};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

fn top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now)
}

fn top_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_hour(0)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now)
}

fn bump_counter(store: &Store, key_id: &str, window_start: DateTime<Utc>) -> Result<i64> {
    let window_key = window_start.to_rfc3339();
    store.immediate_transaction(|conn| {
        conn.execute(
            "INSERT INTO rate_counters (key_id, window_start, request_count)
             VALUES (?1, ?2, 1)
             ON CONFLICT(key_id, window_start) DO UPDATE SET request_count = request_count + 1",
            rusqlite::params![key_id, window_key],
        )?;
        conn.query_row(
            "SELECT request_count FROM rate_counters WHERE key_id = ?1 AND window_start = ?2",
            rusqlite::params![key_id, window_key],
            |row| row.get(0),
        )
        .map_err(Into::into)
    })
}

/// Increments both the hourly and daily counters for `key_id` and checks
/// each against the tier's policy. The most restrictive of the two governs
/// both `remaining` and the denial decision. Returns the headers to attach
/// to the response on success; on internal failure the caller must fail
/// closed, which this signals via an error rather than `Ok`.
pub fn check_and_increment(
    store: &Store,
    config: &Config,
    key_id: &str,
    tier: Tier,
) -> Result<RateLimitHeaders> {
    let policy = config.rate_limit_for(tier);
    let now = Utc::now();

    let hourly_count = bump_counter(store, key_id, top_of_hour(now))? as u64;
    let daily_count = bump_counter(store, key_id, top_of_day(now))? as u64;

    if hourly_count > policy.hourly {
        return Err(KotaError::RateLimited {
            retry_after_secs: seconds_until_next_hour(now),
        });
    }
    if daily_count > policy.daily {
        return Err(KotaError::RateLimited {
            retry_after_secs: seconds_until_next_day(now),
        });
    }

    let hourly_remaining = policy.hourly.saturating_sub(hourly_count);
    let daily_remaining = policy.daily.saturating_sub(daily_count);

    Ok(RateLimitHeaders {
        limit: policy.hourly,
        remaining: hourly_remaining.min(daily_remaining),
        reset_at: top_of_hour(now) + chrono::Duration::hours(1),
    })
}

fn seconds_until_next_hour(now: DateTime<Utc>) -> u64 {
    let next_hour = top_of_hour(now) + chrono::Duration::hours(1);
    (next_hour - now).num_seconds().max(0) as u64
}

fn seconds_until_next_day(now: DateTime<Utc>) -> u64 {
    let next_day = top_of_day(now) + chrono::Duration::days(1);
    (next_day - now).num_seconds().max(0) as u64
}

/// The fail-closed response for an internal error during rate-limit
/// evaluation: reject the request rather than risk unbounded usage.
pub fn fail_closed() -> KotaError {
    KotaError::RateLimited {
        retry_after_secs: 3600,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_of_hour_truncates_minutes_and_seconds() {
        let now = Utc::now();
        let truncated = top_of_hour(now);
        assert_eq!(truncated.minute(), 0);
        assert_eq!(truncated.second(), 0);
    }
}
