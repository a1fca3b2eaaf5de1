//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    CliArgs, Command, FacetListingArgs, GlobalOverrides, ListingArgs, PurgeArgs, ReleasesArgs,
};

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "gamedex";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_STORE_API_URL: &str = "http://localhost:8080/api.php";
const DEFAULT_WIKI_BASE_URL: &str = "http://localhost:8080/wiki/";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_COUNT_LIMIT: u32 = 5000;
const DEFAULT_CACHE_NAMESPACE: &str = "gamedex";
const DEFAULT_CACHE_MAX_ENTRIES: u64 = 2048;
const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
const DEFAULT_QUERY_TTL_SECS: u64 = 3_600;
const DEFAULT_LEGACY_IMAGE_HOST: &str = "https://www.giantbomb.com/a/uploads";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub images: ImageSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Without a URL the version store lives in memory.
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Semantic MediaWiki endpoint.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub api_url: Url,
    pub wiki_base_url: String,
    pub timeout: Duration,
    pub count_limit: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub namespace: String,
    pub max_entries: NonZeroUsize,
    pub single_flight: bool,
    pub default_ttl: Duration,
    pub query_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub legacy_host: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("GAMEDEX").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    images: RawImageSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.store_api_url.as_ref() {
            self.store.api_url = Some(url.clone());
        }
        if let Some(url) = overrides.wiki_base_url.as_ref() {
            self.store.wiki_base_url = Some(url.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            store,
            cache,
            images,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            store: build_store_settings(store)?,
            cache: build_cache_settings(cache)?,
            images: build_image_settings(images)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let api_url = parse_http_url(
        store.api_url.as_deref().unwrap_or(DEFAULT_STORE_API_URL),
        "store.api_url",
    )?;

    let wiki_base_url = store
        .wiki_base_url
        .unwrap_or_else(|| DEFAULT_WIKI_BASE_URL.to_string());
    parse_http_url(&wiki_base_url, "store.wiki_base_url")?;

    let timeout_secs = store.timeout_seconds.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "store.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let count_limit = non_zero_u32(
        store.count_limit.unwrap_or(DEFAULT_COUNT_LIMIT).into(),
        "store.count_limit",
    )?;

    Ok(StoreSettings {
        api_url,
        wiki_base_url,
        timeout: Duration::from_secs(timeout_secs),
        count_limit,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let namespace = cache
        .namespace
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_NAMESPACE.to_string());
    if namespace.is_empty() || namespace.contains(':') {
        return Err(LoadError::invalid(
            "cache.namespace",
            "must be non-empty and must not contain `:`",
        ));
    }

    let max_entries_value = cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES);
    let max_entries = usize::try_from(max_entries_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("cache.max_entries", "must be greater than zero"))?;

    let default_ttl = cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    let query_ttl = cache.query_ttl_seconds.unwrap_or(DEFAULT_QUERY_TTL_SECS);
    if query_ttl == 0 {
        return Err(LoadError::invalid(
            "cache.query_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        namespace,
        max_entries,
        single_flight: cache.single_flight.unwrap_or(true),
        default_ttl: Duration::from_secs(default_ttl),
        query_ttl: Duration::from_secs(query_ttl),
    })
}

fn build_image_settings(images: RawImageSettings) -> Result<ImageSettings, LoadError> {
    let legacy_host = images
        .legacy_host
        .unwrap_or_else(|| DEFAULT_LEGACY_IMAGE_HOST.to_string());
    parse_http_url(&legacy_host, "images.legacy_host")?;

    Ok(ImageSettings {
        legacy_host: legacy_host.trim_end_matches('/').to_string(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    api_url: Option<String>,
    wiki_base_url: Option<String>,
    timeout_seconds: Option<u64>,
    count_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    namespace: Option<String>,
    max_entries: Option<u64>,
    single_flight: Option<bool>,
    default_ttl_seconds: Option<u64>,
    query_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    legacy_host: Option<String>,
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
