use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::versions::VersionStoreError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Version(#[from] VersionStoreError),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Key-value storage addressed by opaque string keys.
///
/// A zero `ttl` stores the entry without expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Returns true when an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Drop every entry. Backends that cannot enumerate keys return an error.
    async fn clear(&self) -> Result<(), CacheError>;
}
