//! Per-prefix version counters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::versions";

/// Version reported for a prefix that was never purged.
pub const INITIAL_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum VersionStoreError {
    #[error("version store unavailable: {0}")]
    Unavailable(String),
    #[error("version store persistence error: {0}")]
    Persistence(String),
}

impl VersionStoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Storage for one integer version per cache prefix.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Current version of `prefix`, [`INITIAL_VERSION`] when no row exists.
    async fn version(&self, prefix: &str) -> Result<i64, VersionStoreError>;

    /// Atomically increment the version of `prefix` and return the new value.
    /// A prefix without a row moves straight to version 2.
    async fn bump(&self, prefix: &str) -> Result<i64, VersionStoreError>;
}

/// Process-local version store used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    versions: Mutex<HashMap<String, i64>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn version(&self, prefix: &str) -> Result<i64, VersionStoreError> {
        Ok(mutex_lock(&self.versions, SOURCE, "version")
            .get(prefix)
            .copied()
            .unwrap_or(INITIAL_VERSION))
    }

    async fn bump(&self, prefix: &str) -> Result<i64, VersionStoreError> {
        let mut versions = mutex_lock(&self.versions, SOURCE, "bump");
        let version = versions
            .entry(prefix.to_string())
            .or_insert(INITIAL_VERSION);
        *version += 1;
        Ok(*version)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn absent_prefix_reads_as_initial_version() {
        let store = InMemoryVersionStore::new();
        assert_eq!(store.version("games").await.expect("version"), 1);
    }

    #[tokio::test]
    async fn first_bump_inserts_two_then_increments() {
        let store = InMemoryVersionStore::new();
        assert_eq!(store.bump("games").await.expect("bump"), 2);
        assert_eq!(store.bump("games").await.expect("bump"), 3);
        assert_eq!(store.version("games").await.expect("version"), 3);
        assert_eq!(store.version("people").await.expect("version"), 1);
    }

    #[tokio::test]
    async fn concurrent_bumps_are_not_lost() {
        let store = Arc::new(InMemoryVersionStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.bump("concepts").await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("bump");
        }
        assert_eq!(store.version("concepts").await.expect("version"), 17);
    }
}
