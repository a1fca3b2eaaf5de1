//! Facet membership resolution.
//!
//! A facet value (e.g. a game title) relates to a set of entities. ANY-of filters take the
//! union of those sets, ALL-of filters their intersection. Intersection stops issuing lookups
//! as soon as the running set is empty.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use crate::application::repos::{PropertyStore, StoreError};
use crate::cache::{CacheService, KeyParams, registry};
use crate::domain::properties::Property;
use crate::domain::query::{Category, Condition, DataQuery, QueryExpression};

/// Entities related to a single facet value.
#[async_trait]
pub trait RelationLookup: Send + Sync {
    async fn related(&self, value: &str) -> Result<BTreeSet<String>, StoreError>;
}

#[async_trait]
impl<T: RelationLookup + ?Sized> RelationLookup for &T {
    async fn related(&self, value: &str) -> Result<BTreeSet<String>, StoreError> {
        (**self).related(value).await
    }
}

/// Entities satisfying the facet filter.
///
/// With `require_all` unset, or a single value, this is the union of the lookups. Otherwise it
/// is their intersection, seeded by the first lookup.
pub async fn resolve_facet_membership<L>(
    values: &[String],
    require_all: bool,
    lookup: &L,
) -> Result<BTreeSet<String>, StoreError>
where
    L: RelationLookup + ?Sized,
{
    if !require_all || values.len() <= 1 {
        let mut union = BTreeSet::new();
        for value in values {
            union.extend(lookup.related(value).await?);
        }
        return Ok(union);
    }

    let mut remaining = values.iter();
    let Some(first) = remaining.next() else {
        return Ok(BTreeSet::new());
    };
    let mut members = lookup.related(first).await?;
    for value in remaining {
        if members.is_empty() {
            debug!(value, "Facet intersection already empty, skipping lookup");
            break;
        }
        let related = lookup.related(value).await?;
        members.retain(|subject| related.contains(subject));
    }
    Ok(members)
}

/// Looks up the subjects of a category whose `property` points at the facet value, `limit`
/// subjects per page until a short page.
pub struct StoreRelationLookup<'a> {
    store: &'a dyn PropertyStore,
    category: Category,
    property: Property,
    limit: u32,
}

impl<'a> StoreRelationLookup<'a> {
    pub fn new(store: &'a dyn PropertyStore, category: Category, property: Property, limit: u32) -> Self {
        Self {
            store,
            category,
            property,
            limit,
        }
    }
}

#[async_trait]
impl RelationLookup for StoreRelationLookup<'_> {
    async fn related(&self, value: &str) -> Result<BTreeSet<String>, StoreError> {
        let expression = QueryExpression::in_category(self.category)
            .and(Condition::Equals(self.property, value.to_string()));
        let mut related = BTreeSet::new();
        let mut offset = 0_u64;
        loop {
            let query = DataQuery::new(expression.clone(), self.limit).offset(offset);
            let rows = self.store.query(&query).await?;
            let fetched = rows.len();
            related.extend(rows.into_iter().map(|row| row.subject.fulltext));
            if fetched < self.limit as usize {
                return Ok(related);
            }
            offset += u64::from(self.limit);
        }
    }
}

/// Caches each facet value's relation set independently under the `facets` prefix.
pub struct CachedRelationLookup<'a, L> {
    inner: L,
    cache: &'a CacheService,
    category: Category,
    property: Property,
}

impl<'a, L> CachedRelationLookup<'a, L> {
    pub fn new(inner: L, cache: &'a CacheService, category: Category, property: Property) -> Self {
        Self {
            inner,
            cache,
            category,
            property,
        }
    }
}

#[async_trait]
impl<L: RelationLookup> RelationLookup for CachedRelationLookup<'_, L> {
    async fn related(&self, value: &str) -> Result<BTreeSet<String>, StoreError> {
        let params = KeyParams::new()
            .with("category", self.category.as_str())
            .with("property", self.property.label())
            .with("value", value);
        let key = self.cache.build_key(registry::FACETS, &params).await;
        let ttl = self.cache.config().query_ttl();
        self.cache
            .try_get_or_set(&key, ttl, || self.inner.related(value))
            .await
    }
}
