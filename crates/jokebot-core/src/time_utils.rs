use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Wall-clock milliseconds since the Unix epoch; saturates instead of wrapping.
pub fn current_unix_timestamp_ms() -> u64 {
    u64::try_from(since_epoch().as_millis()).unwrap_or(u64::MAX)
}

/// Returns true when an entry started at `started_unix_ms` has outlived `ttl_ms`.
///
/// A zero TTL disables expiry. A start time in the future never expires.
pub fn is_expired_unix_ms(started_unix_ms: u64, ttl_ms: u64, now_unix_ms: u64) -> bool {
    ttl_ms > 0 && now_unix_ms.saturating_sub(started_unix_ms) >= ttl_ms
}
