use std::time::Duration;

use async_trait::async_trait;
use gamedex_types::ConceptSummary;

use super::people::entity_text;
use super::{CatalogContext, EntityListing, Facet};
use crate::cache::{CacheConfig, Ttl, registry};
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{Category, SortKey};

/// Concepts, filterable by the games they appear in.
pub struct ConceptsListing;

#[async_trait]
impl EntityListing for ConceptsListing {
    type Item = ConceptSummary;

    const PREFIX: &'static str = registry::CONCEPTS;
    const ENTITY: &'static str = "concepts";
    const CATEGORY: Category = Category::Concepts;
    const FACET: Option<Facet> = Some(Facet {
        property: Property::Games,
        key: "games",
    });
    const DEFAULT_SORT: SortKey = SortKey::Alphabetical;
    const SORTS: &'static [SortKey] = &[
        SortKey::Alphabetical,
        SortKey::LastEdited,
        SortKey::LastCreated,
    ];
    const PROJECTIONS: &'static [Property] = &[
        Property::Name,
        Property::Deck,
        Property::Image,
        Property::BackgroundImage,
        Property::Caption,
    ];

    fn ttl(&self, _cache: &CacheConfig) -> Duration {
        Ttl::HOUR
    }

    async fn map_rows(&self, ctx: &CatalogContext, rows: Vec<PropertyRow>) -> Vec<ConceptSummary> {
        let mut concepts = Vec::with_capacity(rows.len());
        for row in rows {
            let image = ctx.images.entity_image(&row).await;
            let (title, deck, caption) = entity_text(&row, Category::Concepts);
            concepts.push(ConceptSummary {
                url: row.subject.url,
                title,
                deck,
                image,
                caption,
            });
        }
        concepts
    }
}
