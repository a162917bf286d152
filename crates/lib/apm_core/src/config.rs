//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::scope::DEFAULT_API_VERSION;
use crate::storage::FileStorage;

const DEFAULT_REFRESH_RETRY_DELAY_MS: u64 = 1000;

/// Retry policy applied to the refresh call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Configuration for an [`crate::ApiClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend base URL. When unset the server is restored from storage or
    /// supplied at login.
    pub server: Option<String>,
    /// REST API version segment.
    pub api_version: u32,
    /// JSON file backing persisted client state.
    pub storage_path: PathBuf,
    pub refresh_retry: RetryPolicy,
    /// Client-side expiry of the stored refresh token.
    pub refresh_token_ttl: Option<chrono::Duration>,
    /// Refresh this long before the bearer token expires. `None` disables
    /// the proactive refresh timer.
    pub refresh_margin: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                       | Default                        |
    /// |--------------------------------|--------------------------------|
    /// | `APM_SERVER`                   | unset                          |
    /// | `APM_API_VERSION`              | `1`                            |
    /// | `APM_STORAGE_PATH`             | `<data dir>/apm/storage.json`  |
    /// | `APM_REFRESH_RETRIES`          | `0`                            |
    /// | `APM_REFRESH_RETRY_DELAY_MS`   | `1000`                         |
    /// | `APM_REFRESH_TOKEN_TTL_HOURS`  | unset (non-expiring)           |
    /// | `APM_REFRESH_MARGIN_SECS`      | unset (no proactive refresh)   |
    /// | `APM_REQUEST_TIMEOUT_SECS`     | unset                          |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`] but reading variables through `lookup`.
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| -> Option<u64> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        };

        let retries = number("APM_REFRESH_RETRIES")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        let delay = number("APM_REFRESH_RETRY_DELAY_MS").unwrap_or(DEFAULT_REFRESH_RETRY_DELAY_MS);

        Self {
            server: lookup("APM_SERVER").filter(|s| !s.trim().is_empty()),
            api_version: number("APM_API_VERSION")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_API_VERSION),
            storage_path: lookup("APM_STORAGE_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(FileStorage::default_path),
            refresh_retry: RetryPolicy::fixed(retries, Duration::from_millis(delay)),
            refresh_token_ttl: number("APM_REFRESH_TOKEN_TTL_HOURS")
                .and_then(|h| i64::try_from(h).ok())
                .filter(|h| *h > 0)
                .and_then(chrono::Duration::try_hours),
            refresh_margin: number("APM_REFRESH_MARGIN_SECS").map(Duration::from_secs),
            request_timeout: number("APM_REQUEST_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
