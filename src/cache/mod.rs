//! Versioned cache layer.
//!
//! Every cached catalog result lives under a key of the form `prefix-v{version}-{params}`.
//! Purging a prefix bumps its version in the [`VersionStore`], which orphans all keys built
//! under the old version; stale entries are never read again and age out of the backend.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! namespace = "gamedex"
//! max_entries = 2048
//! single_flight = true
//! # ... see config.rs for all options
//! ```

mod backend;
mod config;
mod keys;
mod lock;
pub mod registry;
mod service;
mod store;
mod versions;

pub use backend::{CacheBackend, CacheError};
pub use config::CacheConfig;
pub use keys::{
    KeyParam, KeyParams, compose_key, compose_simple_key, ensure_namespaced, format_ttl,
    namespaced, sanitize,
};
pub use registry::{KNOWN_PREFIXES, Ttl, is_known_prefix};
pub use service::{CacheService, VersionChange};
pub use store::MemoryBackend;
pub use versions::{INITIAL_VERSION, InMemoryVersionStore, VersionStore, VersionStoreError};
