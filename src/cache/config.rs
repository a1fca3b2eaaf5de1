//! Cache configuration.
//!
//! Controls the in-process backend and the query cache via `gamedex.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_NAMESPACE: &str = "gamedex";
const DEFAULT_MAX_ENTRIES: usize = 2048;
const DEFAULT_TTL_SECONDS: u64 = 86_400;
const DEFAULT_QUERY_TTL_SECONDS: u64 = 3_600;

/// Cache configuration from `gamedex.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching. When off every lookup is a miss and nothing is stored.
    pub enabled: bool,
    /// Namespace prepended to every backend key.
    pub namespace: String,
    /// Maximum entries held by the in-process backend.
    pub max_entries: usize,
    /// Serialize concurrent misses on the same key.
    pub single_flight: bool,
    /// TTL applied when a caller does not pick one.
    pub default_ttl_seconds: u64,
    /// TTL for catalog listing queries.
    pub query_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
            single_flight: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            query_ttl_seconds: DEFAULT_QUERY_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            namespace: settings.namespace.clone(),
            max_entries: settings.max_entries.get(),
            single_flight: settings.single_flight,
            default_ttl_seconds: settings.default_ttl.as_secs(),
            query_ttl_seconds: settings.query_ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    /// Returns the backend capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_seconds)
    }
}
