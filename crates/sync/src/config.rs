use std::time::Duration;

/// Default timeout for fetches triggered by change events.
const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for user-initiated writes.
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Default base delay of the linear backoff.
const DEFAULT_RETRY_BASE_MS: u64 = 1_000;

/// Default number of retries after the first failure.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client-side timeouts and retry policy shared by every feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Bound on a single fetch or subscribe call.
    pub read_timeout: Duration,
    /// Bound on a single insert/update/delete/upload.
    pub write_timeout: Duration,
    /// Retry `n` waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
    /// Retries after the first failure before giving up.
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `SYNC_READ_TIMEOUT_MS`  | `5000`  |
    /// | `SYNC_WRITE_TIMEOUT_MS` | `10000` |
    /// | `SYNC_RETRY_BASE_MS`    | `1000`  |
    /// | `SYNC_MAX_RETRIES`      | `3`     |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(parse_or(&lookup, key, default))
        };
        Self {
            read_timeout: millis("SYNC_READ_TIMEOUT_MS", DEFAULT_READ_TIMEOUT_MS),
            write_timeout: millis("SYNC_WRITE_TIMEOUT_MS", DEFAULT_WRITE_TIMEOUT_MS),
            retry_base_delay: millis("SYNC_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS),
            max_retries: parse_or(&lookup, "SYNC_MAX_RETRIES", DEFAULT_MAX_RETRIES),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid sync setting, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(SyncConfig::from_lookup(lookup(&[])), SyncConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("SYNC_READ_TIMEOUT_MS", "250"),
            ("SYNC_MAX_RETRIES", "5"),
        ]));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.write_timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = SyncConfig::from_lookup(lookup(&[("SYNC_RETRY_BASE_MS", "soon")]));
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
    }
}
