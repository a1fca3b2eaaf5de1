//! Tracing subscriber installation and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "gamedex_cache_hit_total",
            Unit::Count,
            "Total number of query cache hits."
        );
        describe_counter!(
            "gamedex_cache_miss_total",
            Unit::Count,
            "Total number of query cache misses."
        );
        describe_counter!(
            "gamedex_cache_set_total",
            Unit::Count,
            "Total number of values stored in the query cache."
        );
        describe_counter!(
            "gamedex_cache_evict_total",
            Unit::Count,
            "Total number of cache evictions due to capacity."
        );
        describe_counter!(
            "gamedex_cache_purge_total",
            Unit::Count,
            "Total number of prefix purges."
        );
        describe_counter!(
            "gamedex_catalog_degraded_total",
            Unit::Count,
            "Catalog queries answered with an empty result after a store failure."
        );
        describe_histogram!(
            "gamedex_catalog_query_ms",
            Unit::Milliseconds,
            "Property store latency of an uncached catalog query in milliseconds."
        );
    });
}
