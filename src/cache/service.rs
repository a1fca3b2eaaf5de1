//! Cache service: versioned keys, get-or-compute and prefix purges.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;
use super::keys::{self, KeyParams};
use super::registry::KNOWN_PREFIXES;
use super::versions::{INITIAL_VERSION, VersionStore};

pub(crate) const METRIC_HIT: &str = "gamedex_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "gamedex_cache_miss_total";
pub(crate) const METRIC_SET: &str = "gamedex_cache_set_total";
pub(crate) const METRIC_PURGE: &str = "gamedex_cache_purge_total";

/// Version transition reported by a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub old: i64,
    pub new: i64,
}

type FlightMap = DashMap<String, Arc<Mutex<()>>>;

/// Holds the per-key lock of a single-flight computation and drops the map entry once no
/// other caller is waiting on it.
struct Flight<'a> {
    flights: &'a FlightMap,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.flights
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Injected cache facade over a [`CacheBackend`] and a [`VersionStore`].
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    versions: Arc<dyn VersionStore>,
    config: CacheConfig,
    flights: FlightMap,
}

impl CacheService {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        versions: Arc<dyn VersionStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            backend,
            versions,
            config,
            flights: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Join components under the configured namespace.
    pub fn make_key(&self, components: &[&str]) -> String {
        keys::namespaced(&self.config.namespace, components)
    }

    fn backend_key(&self, key: &str) -> String {
        keys::ensure_namespaced(&self.config.namespace, key)
    }

    // ========================================================================
    // Versioned keys
    // ========================================================================

    /// Current version of `prefix`. Read failures fall back to the initial version so the
    /// request path keeps serving.
    pub async fn current_version(&self, prefix: &str) -> i64 {
        match self.versions.version(prefix).await {
            Ok(version) => version,
            Err(err) => {
                warn!(
                    prefix,
                    error = %err,
                    fallback = INITIAL_VERSION,
                    "Version lookup failed"
                );
                INITIAL_VERSION
            }
        }
    }

    pub async fn build_key(&self, prefix: &str, params: &KeyParams) -> String {
        let version = self.current_version(prefix).await;
        keys::compose_key(prefix, version, params)
    }

    pub async fn build_simple_key(&self, prefix: &str, suffix: Option<&str>) -> String {
        let version = self.current_version(prefix).await;
        keys::compose_simple_key(prefix, version, suffix)
    }

    // ========================================================================
    // Entry access
    // ========================================================================

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let value = self.backend.get(&self.backend_key(key)).await?;
        match value {
            Some(value) => {
                metrics::counter!(METRIC_HIT).increment(1);
                debug!(key, "Cache hit");
                Ok(Some(serde_json::from_value(value)?))
            }
            None => {
                metrics::counter!(METRIC_MISS).increment(1);
                debug!(key, "Cache miss");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if !self.config.enabled {
            return Ok(());
        }
        let payload = serde_json::to_value(value)?;
        self.backend
            .set(&self.backend_key(key), payload, ttl)
            .await?;
        metrics::counter!(METRIC_SET).increment(1);
        debug!(key, ttl = %keys::format_ttl(ttl), "Cache set");
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete(&self.backend_key(key)).await
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// Presence decides a hit, so empty or falsy results are cached like any other. Backend
    /// failures are logged and treated as misses.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let result: Result<T, Infallible> = self
            .try_get_or_set(key, ttl, move || async move { Ok(compute().await) })
            .await;
        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_set`](Self::get_or_set) for fallible computations. Errors are returned to
    /// the caller and never cached.
    pub async fn try_get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }

        let flight = self.enter_flight(key).await;
        if flight.is_some()
            && let Some(value) = self.lookup(key).await
        {
            return Ok(value);
        }

        debug!(key, "Computing value for cache miss");
        let value = compute().await?;
        if let Err(err) = self.set(key, &value, ttl).await {
            warn!(key, error = %err, "Failed to store computed value");
        }
        Ok(value)
    }

    /// Versioned variant of [`get_or_set`](Self::get_or_set): `key-version`.
    pub async fn get_or_set_versioned<T, F, Fut>(
        &self,
        key: &str,
        version: &str,
        ttl: Duration,
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = format!("{key}-{version}");
        self.get_or_set(&key, ttl, compute).await
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn enter_flight(&self, key: &str) -> Option<Flight<'_>> {
        if !self.config.single_flight {
            return None;
        }
        let lock = Arc::clone(&*self.flights.entry(key.to_string()).or_default());
        let guard = lock.lock_owned().await;
        Some(Flight {
            flights: &self.flights,
            key: key.to_string(),
            guard: Some(guard),
        })
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Bump the version of `prefix`, orphaning every key built under the old one.
    pub async fn purge_by_prefix(&self, prefix: &str) -> Result<i64, CacheError> {
        let version = self.versions.bump(prefix).await?;
        metrics::counter!(METRIC_PURGE).increment(1);
        info!(prefix, old = version - 1, new = version, "Purged cache prefix");
        Ok(version)
    }

    /// Purge every known prefix.
    pub async fn purge_all(&self) -> Result<BTreeMap<String, VersionChange>, CacheError> {
        let mut results = BTreeMap::new();
        for prefix in KNOWN_PREFIXES {
            let old = self.versions.version(prefix).await?;
            let new = self.purge_by_prefix(prefix).await?;
            results.insert(prefix.to_string(), VersionChange { old, new });
        }
        Ok(results)
    }

    /// Drop a single entry.
    pub async fn purge_key(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.delete(key).await?;
        info!(key, removed, "Purged cache key");
        Ok(removed)
    }

    /// Drop every entry held by the backend.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear().await?;
        info!("Cleared cache backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::cache::store::MemoryBackend;
    use crate::cache::versions::{InMemoryVersionStore, VersionStoreError};

    fn service_with(config: CacheConfig) -> CacheService {
        CacheService::new(
            Arc::new(MemoryBackend::new(&config)),
            Arc::new(InMemoryVersionStore::new()),
            config,
        )
    }

    fn service() -> CacheService {
        service_with(CacheConfig::default())
    }

    struct FailingVersions;

    #[async_trait]
    impl VersionStore for FailingVersions {
        async fn version(&self, _prefix: &str) -> Result<i64, VersionStoreError> {
            Err(VersionStoreError::Unavailable("connection refused".to_string()))
        }

        async fn bump(&self, _prefix: &str) -> Result<i64, VersionStoreError> {
            Err(VersionStoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::backend("backend down"))
        }

        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::backend("backend down"))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::backend("backend down"))
        }

        async fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::backend("backend down"))
        }
    }

    #[tokio::test]
    async fn build_key_embeds_current_version() {
        let cache = service();
        let params = KeyParams::new().with("letter", "B").with("page", 1u32);

        let before = cache.build_key("concepts", &params).await;
        assert_eq!(before, "concepts-v1-letter_B-page_1");

        let new_version = cache.purge_by_prefix("concepts").await.expect("purge");
        assert_eq!(new_version, 2);

        let after = cache.build_key("concepts", &params).await;
        assert_eq!(after, "concepts-v2-letter_B-page_1");
        assert_ne!(before, after);

        assert_eq!(
            cache.build_simple_key("concepts", Some("all")).await,
            "concepts-v2-all"
        );
    }

    #[tokio::test]
    async fn purge_only_touches_its_prefix() {
        let cache = service();
        cache.purge_by_prefix("games").await.expect("purge");
        assert_eq!(cache.build_simple_key("games", None).await, "games-v2");
        assert_eq!(cache.build_simple_key("people", None).await, "people-v1");
    }

    #[tokio::test]
    async fn get_or_set_computes_once_even_for_falsy_values() {
        let cache = service();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Vec<String> = cache
                .get_or_set("people-v1-letter_Z", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Vec::new()
                })
                .await;
            assert!(value.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let flag: bool = cache
            .get_or_set("flag", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await;
        let again: bool = cache
            .get_or_set("flag", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
            .await;
        assert!(!flag);
        assert!(!again);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn versioned_entries_are_separate_per_version() {
        let cache = service();
        let calls = AtomicUsize::new(0);
        let compute = |label: &'static str| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                label.to_string()
            }
        };
        let ttl = Duration::from_secs(60);

        let first: String = cache
            .get_or_set_versioned("platform_list", "v1", ttl, compute("one"))
            .await;
        let second: String = cache
            .get_or_set_versioned("platform_list", "v2", ttl, compute("two"))
            .await;
        let repeat: String = cache
            .get_or_set_versioned("platform_list", "v1", ttl, compute("three"))
            .await;

        assert_eq!(first, "one");
        assert_eq!(second, "two");
        assert_eq!(repeat, "one");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.get::<String>("platform_list-v2").await.expect("get"),
            Some("two".to_string())
        );
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = service();
        let calls = AtomicUsize::new(0);

        let first: Result<u64, &str> = cache
            .try_get_or_set("games-v1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("store unavailable")
            })
            .await;
        assert!(first.is_err());

        let second: Result<u64, &str> = cache
            .try_get_or_set("games-v1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_flight_collapses_concurrent_misses() {
        let cache = Arc::new(service());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_set("releases-v1", Duration::from_secs(60), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            42u32
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.expect("join"), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.flights.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let cache = service_with(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let _: u8 = cache
                .get_or_set("games-v1", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    1
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn purge_all_reports_old_and_new_versions() {
        let cache = service();
        cache.purge_by_prefix("games").await.expect("purge");

        let results = cache.purge_all().await.expect("purge all");
        assert_eq!(results.len(), KNOWN_PREFIXES.len());
        assert_eq!(results["games"], VersionChange { old: 2, new: 3 });
        assert_eq!(results["people"], VersionChange { old: 1, new: 2 });
    }

    #[tokio::test]
    async fn purge_key_deletes_single_entry() {
        let cache = service();
        cache
            .set("platforms-v1-page_1", &1u8, Duration::from_secs(60))
            .await
            .expect("set");
        assert!(cache.purge_key("platforms-v1-page_1").await.expect("purge"));
        assert!(!cache.purge_key("platforms-v1-page_1").await.expect("purge"));
        let cached: Option<u8> = cache.get("platforms-v1-page_1").await.expect("get");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn version_read_failure_falls_back_but_bump_failure_surfaces() {
        let config = CacheConfig::default();
        let cache = CacheService::new(
            Arc::new(MemoryBackend::new(&config)),
            Arc::new(FailingVersions),
            config,
        );
        assert_eq!(cache.build_simple_key("games", None).await, "games-v1");
        assert!(matches!(
            cache.purge_by_prefix("games").await,
            Err(CacheError::Version(_))
        ));
        assert!(cache.purge_all().await.is_err());
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_compute() {
        let cache = CacheService::new(
            Arc::new(FailingBackend),
            Arc::new(InMemoryVersionStore::new()),
            CacheConfig::default(),
        );
        let value: u8 = cache
            .get_or_set("games-v1", Duration::from_secs(60), || async { 9 })
            .await;
        assert_eq!(value, 9);
    }

    #[test]
    fn make_key_uses_namespace() {
        let cache = service();
        assert_eq!(
            cache.make_key(&["platforms", "abbreviations", "v1"]),
            "gamedex:platforms:abbreviations:v1"
        );
    }
}
