//! Catalog listings.
//!
//! Every entity listing follows the same pipeline: build the filter expression, resolve
//! ALL-of facet filters into an explicit subject list, count, clamp the page, fetch one window
//! of rows and map them. The whole pipeline runs inside the cache keyed by the filter.

mod concepts;
mod directory;
mod games;
mod people;
mod platforms;
mod releases;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamedex_types::PagedResult;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error};

use crate::application::facets::{
    CachedRelationLookup, StoreRelationLookup, resolve_facet_membership,
};
use crate::application::images::ImageResolver;
use crate::application::pagination::{PageWindow, PaginationError};
use crate::application::repos::{PropertyStore, StoreError};
use crate::cache::{CacheConfig, CacheService};
use crate::domain::filters::FilterSpec;
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{Category, Condition, DataQuery, QueryExpression, SortKey};

pub use concepts::ConceptsListing;
pub use directory::{PlatformDirectory, abbreviation_for};
pub use games::GamesListing;
pub use people::PeopleListing;
pub use platforms::PlatformsListing;
pub use releases::{
    RELEASE_LIMIT, ReleaseFilter, ReleaseService, dedupe_releases, group_by_period,
};

pub(crate) const METRIC_DEGRADED: &str = "gamedex_catalog_degraded_total";
pub(crate) const METRIC_QUERY_MS: &str = "gamedex_catalog_query_ms";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

/// Collaborators shared by all catalog services.
pub struct CatalogContext {
    pub store: Arc<dyn PropertyStore>,
    pub cache: Arc<CacheService>,
    pub images: ImageResolver,
    pub directory: PlatformDirectory,
    /// Page size of relation lookups.
    pub count_limit: u32,
}

impl CatalogContext {
    pub fn new(
        store: Arc<dyn PropertyStore>,
        cache: Arc<CacheService>,
        images: ImageResolver,
        count_limit: u32,
    ) -> Self {
        let directory = PlatformDirectory::new(Arc::clone(&store), Arc::clone(&cache));
        Self {
            store,
            cache,
            images,
            directory,
            count_limit,
        }
    }
}

/// Facet a listing can be filtered on.
#[derive(Debug, Clone, Copy)]
pub struct Facet {
    pub property: Property,
    /// Parameter name used in cache keys.
    pub key: &'static str,
}

/// Entity-specific parts of a catalog listing.
#[async_trait]
pub trait EntityListing: Send + Sync {
    type Item: Serialize + DeserializeOwned + Send + Sync;

    /// Cache prefix.
    const PREFIX: &'static str;
    /// Name used in logs.
    const ENTITY: &'static str;
    const CATEGORY: Category;
    const FACET: Option<Facet>;
    const DEFAULT_SORT: SortKey;
    const SORTS: &'static [SortKey];
    const PROJECTIONS: &'static [Property];

    /// Condition for the free-text search of the filter, if the listing supports one.
    fn search_condition(&self, _text: &str) -> Option<Condition> {
        None
    }

    fn ttl(&self, cache: &CacheConfig) -> Duration {
        cache.query_ttl()
    }

    async fn map_rows(&self, ctx: &CatalogContext, rows: Vec<PropertyRow>) -> Vec<Self::Item>;
}

pub struct CatalogService<L> {
    ctx: Arc<CatalogContext>,
    listing: L,
}

pub type GamesService = CatalogService<GamesListing>;
pub type PlatformsService = CatalogService<PlatformsListing>;
pub type PeopleService = CatalogService<PeopleListing>;
pub type ConceptsService = CatalogService<ConceptsListing>;

impl<L: EntityListing> CatalogService<L> {
    pub fn new(ctx: Arc<CatalogContext>, listing: L) -> Self {
        Self { ctx, listing }
    }

    /// Requested sort when the listing supports it, the listing default otherwise.
    pub fn effective_sort(&self, filter: &FilterSpec) -> SortKey {
        filter
            .sort
            .filter(|sort| L::SORTS.contains(sort))
            .unwrap_or(L::DEFAULT_SORT)
    }

    /// Cached listing page. Store failures degrade to an empty page and are not cached.
    pub async fn query(&self, filter: &FilterSpec) -> PagedResult<L::Item> {
        match self.try_query(filter).await {
            Ok(page) => page,
            Err(err) => {
                error!(entity = L::ENTITY, error = %err, "Catalog query failed, serving empty result");
                metrics::counter!(METRIC_DEGRADED, "entity" => L::ENTITY).increment(1);
                PagedResult::empty(filter.page_size)
            }
        }
    }

    /// Cached listing page, surfacing store failures.
    pub async fn try_query(&self, filter: &FilterSpec) -> Result<PagedResult<L::Item>, CatalogError> {
        let sort = self.effective_sort(filter);
        let facet_key = L::FACET.map_or("facets", |facet| facet.key);
        let cache = &self.ctx.cache;
        let key = cache.build_key(L::PREFIX, &filter.key_params(facet_key, sort)).await;
        let ttl = self.listing.ttl(cache.config());
        cache
            .try_get_or_set(&key, ttl, || self.fetch(filter, sort))
            .await
    }

    async fn fetch(
        &self,
        filter: &FilterSpec,
        sort: SortKey,
    ) -> Result<PagedResult<L::Item>, CatalogError> {
        let started = Instant::now();
        let store = self.ctx.store.as_ref();

        let Some(expression) = self.expression(filter).await? else {
            debug!(entity = L::ENTITY, "Facet intersection is empty");
            return Ok(PagedResult::empty(filter.page_size));
        };

        let total = store.count(&expression).await?;
        let window = PageWindow::resolve(total, filter.page, filter.page_size)?;
        if total == 0 {
            return Ok(window.into_result(Vec::new()));
        }

        let query = DataQuery::new(expression, window.page_size)
            .sorted(sort.directive())
            .offset(window.offset)
            .project(L::PROJECTIONS);
        let rows = store.query(&query).await?;
        let items = self.listing.map_rows(&self.ctx, rows).await;

        metrics::histogram!(METRIC_QUERY_MS, "entity" => L::ENTITY)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            entity = L::ENTITY,
            total,
            page = window.current_page,
            items = items.len(),
            "Catalog page fetched"
        );
        Ok(window.into_result(items))
    }

    /// Filter expression, or `None` when an ALL-of facet filter matches nothing.
    async fn expression(&self, filter: &FilterSpec) -> Result<Option<QueryExpression>, CatalogError> {
        let mut expression = QueryExpression::in_category(L::CATEGORY);

        if let Some(letter) = filter.letter {
            expression.push(Condition::AnyPrefix(Property::Name, letter.prefixes()));
        }

        if let Some(condition) = filter
            .search
            .as_deref()
            .and_then(|text| self.listing.search_condition(text))
        {
            expression.push(condition);
        }

        if let Some(facet) = L::FACET
            && !filter.facet_values.is_empty()
        {
            if filter.needs_intersection() {
                let lookup = CachedRelationLookup::new(
                    StoreRelationLookup::new(
                        self.ctx.store.as_ref(),
                        L::CATEGORY,
                        facet.property,
                        self.ctx.count_limit,
                    ),
                    &self.ctx.cache,
                    L::CATEGORY,
                    facet.property,
                );
                let members = resolve_facet_membership(&filter.facet_values, true, &lookup).await?;
                if members.is_empty() {
                    return Ok(None);
                }
                for value in &filter.facet_values {
                    expression.push(Condition::Equals(facet.property, value.clone()));
                }
            } else {
                expression.push(Condition::AnyOf(facet.property, filter.facet_values.clone()));
            }
        }

        Ok(Some(expression))
    }
}

impl GamesService {
    pub fn games(ctx: Arc<CatalogContext>) -> Self {
        Self::new(ctx, GamesListing)
    }
}

impl PlatformsService {
    pub fn platforms(ctx: Arc<CatalogContext>) -> Self {
        Self::new(ctx, PlatformsListing)
    }
}

impl PeopleService {
    pub fn people(ctx: Arc<CatalogContext>) -> Self {
        Self::new(ctx, PeopleListing)
    }
}

impl ConceptsService {
    pub fn concepts(ctx: Arc<CatalogContext>) -> Self {
        Self::new(ctx, ConceptsListing)
    }
}

/// Subject page name with its category prefix removed and underscores shown as spaces.
pub(crate) fn display_name(subject: &str, category: Category) -> String {
    subject
        .strip_prefix(&category.page_prefix())
        .unwrap_or(subject)
        .replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_category_prefix() {
        assert_eq!(display_name("People/Jeff_Gerstmann", Category::People), "Jeff Gerstmann");
        assert_eq!(display_name("Platforms/PC", Category::Platforms), "PC");
        assert_eq!(display_name("Mario", Category::Games), "Mario");
    }
}
