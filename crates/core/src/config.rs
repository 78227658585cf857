//! Environment-driven configuration helpers.

use std::str::FromStr;
use std::time::Duration;

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset or unparseable.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a millisecond duration from the environment.
pub fn env_duration_ms(key: &str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(env_or(key, default_ms))
}
