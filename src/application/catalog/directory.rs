//! Platform lookups shared by the listings: abbreviations, the dropdown list and per-platform
//! game counts.

use std::collections::HashMap;
use std::sync::Arc;

use gamedex_types::PlatformOption;
use tracing::{info, warn};

use crate::application::repos::{PropertyStore, StoreError};
use crate::cache::{CacheService, KeyParams, Ttl, registry};
use crate::domain::properties::{Property, PropertyRow, basename};
use crate::domain::query::{Category, Condition, DataQuery, QueryExpression, SortKey};

const PLATFORM_LIMIT: u32 = 500;

pub struct PlatformDirectory {
    store: Arc<dyn PropertyStore>,
    cache: Arc<CacheService>,
}

impl PlatformDirectory {
    pub fn new(store: Arc<dyn PropertyStore>, cache: Arc<CacheService>) -> Self {
        Self { store, cache }
    }

    /// Platform name to abbreviation.
    ///
    /// Each platform is reachable by its page name (`Platforms/PlayStation 5`), its clean name
    /// (`PlayStation 5`) and its display name. Platforms without a short name map to their
    /// clean name. Cached for a day; a failed load yields an empty map and is retried on the
    /// next call.
    pub async fn mappings(&self) -> HashMap<String, String> {
        let key = self
            .cache
            .build_simple_key(registry::PLATFORM_MAPPINGS, None)
            .await;
        let result = self
            .cache
            .try_get_or_set(&key, Ttl::DAY, || async {
                let rows = self.platform_rows(false).await?;
                let mappings = build_mappings(&rows);
                info!(entries = mappings.len(), "Loaded platform mappings");
                Ok::<_, StoreError>(mappings)
            })
            .await;
        result.unwrap_or_else(|err| {
            warn!(error = %err, "Platform mappings unavailable");
            HashMap::new()
        })
    }

    /// Every platform for filter dropdowns, sorted by name. Cached for a day.
    pub async fn all_platforms(&self) -> Vec<PlatformOption> {
        let key = self.cache.build_simple_key(registry::PLATFORM_LIST, None).await;
        let result = self
            .cache
            .try_get_or_set(&key, Ttl::DAY, || async {
                let rows = self.platform_rows(true).await?;
                let platforms: Vec<PlatformOption> = rows.iter().map(platform_option).collect();
                info!(platforms = platforms.len(), "Loaded platform list");
                Ok::<_, StoreError>(platforms)
            })
            .await;
        result.unwrap_or_else(|err| {
            warn!(error = %err, "Platform list unavailable");
            Vec::new()
        })
    }

    /// Number of games on a platform, cached per platform. Failures count as zero.
    pub async fn game_count(&self, platform: &str) -> u64 {
        let name = platform.strip_prefix("Platforms/").unwrap_or(platform);
        let params = KeyParams::new().with("gameCount", name);
        let key = self.cache.build_key(registry::PLATFORMS, &params).await;
        let ttl = self.cache.config().default_ttl();
        let expression = QueryExpression::in_category(Category::Games)
            .and(Condition::Equals(Property::Platforms, format!("Platforms/{name}")));
        let result = self
            .cache
            .try_get_or_set(&key, ttl, || self.store.count(&expression))
            .await;
        result.unwrap_or_else(|err| {
            warn!(platform = name, error = %err, "Game count unavailable");
            0
        })
    }

    async fn platform_rows(&self, sorted: bool) -> Result<Vec<PropertyRow>, StoreError> {
        let mut query = DataQuery::new(QueryExpression::in_category(Category::Platforms), PLATFORM_LIMIT)
            .project(&[Property::Name, Property::ShortName]);
        if sorted {
            query = query.sorted(SortKey::Alphabetical.directive());
        }
        self.store.query(&query).await
    }
}

fn clean_name(page: &str) -> &str {
    page.strip_prefix("Platforms/").unwrap_or(page)
}

fn build_mappings(rows: &[PropertyRow]) -> HashMap<String, String> {
    let mut mappings = HashMap::new();
    for row in rows {
        let page = row.subject.fulltext.as_str();
        let clean = clean_name(page);
        let abbreviation = row
            .text(Property::ShortName)
            .unwrap_or(clean)
            .to_string();
        mappings.insert(page.to_string(), abbreviation.clone());
        mappings.insert(clean.to_string(), abbreviation.clone());
        if let Some(display) = row.text(Property::Name)
            && display != clean
        {
            mappings.insert(display.to_string(), abbreviation);
        }
    }
    mappings
}

fn platform_option(row: &PropertyRow) -> PlatformOption {
    let clean = clean_name(&row.subject.fulltext);
    PlatformOption {
        name: clean.to_string(),
        display_name: row.text(Property::Name).unwrap_or(clean).to_string(),
        abbreviation: row.text(Property::ShortName).unwrap_or(clean).to_string(),
    }
}

/// Abbreviation for a platform name, falling back to the last path segment of the name.
pub fn abbreviation_for(mappings: &HashMap<String, String>, platform: &str) -> String {
    mappings
        .get(platform)
        .cloned()
        .unwrap_or_else(|| basename(platform).to_string())
}
