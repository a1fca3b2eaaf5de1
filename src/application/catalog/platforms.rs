use async_trait::async_trait;
use futures::future::join_all;
use gamedex_types::PlatformSummary;

use super::{CatalogContext, EntityListing, display_name};
use crate::cache::registry;
use crate::domain::dates::release_date_fields;
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{Category, Condition, SortKey};

/// Platforms, searchable by the title of a game released on them.
pub struct PlatformsListing;

#[async_trait]
impl EntityListing for PlatformsListing {
    type Item = PlatformSummary;

    const PREFIX: &'static str = registry::PLATFORMS;
    const ENTITY: &'static str = "platforms";
    const CATEGORY: Category = Category::Platforms;
    const FACET: Option<super::Facet> = None;
    const DEFAULT_SORT: SortKey = SortKey::ReleaseDate;
    const SORTS: &'static [SortKey] = &[SortKey::Alphabetical, SortKey::ReleaseDate];
    const PROJECTIONS: &'static [Property] = &[
        Property::Name,
        Property::ShortName,
        Property::Image,
        Property::BackgroundImage,
        Property::Deck,
        Property::ReleaseDate,
        Property::ReleaseDateType,
    ];

    fn search_condition(&self, text: &str) -> Option<Condition> {
        Some(Condition::Wildcard(Property::Games, text.to_string()))
    }

    async fn map_rows(&self, ctx: &CatalogContext, rows: Vec<PropertyRow>) -> Vec<PlatformSummary> {
        let counts = join_all(
            rows.iter()
                .map(|row| ctx.directory.game_count(&row.subject.fulltext)),
        )
        .await;

        let mut platforms = Vec::with_capacity(rows.len());
        for (row, game_count) in rows.iter().zip(counts) {
            let image = ctx.images.entity_image(row).await;
            platforms.push(platform_summary(row, image, game_count));
        }
        platforms
    }
}

fn platform_summary(row: &PropertyRow, image: Option<String>, game_count: u64) -> PlatformSummary {
    PlatformSummary {
        url: row.subject.url.clone(),
        title: row
            .text(Property::Name)
            .map(str::to_string)
            .unwrap_or_else(|| display_name(&row.subject.fulltext, Category::Platforms)),
        short_name: row.text(Property::ShortName).map(str::to_string),
        deck: row.text(Property::Deck).map(str::to_string),
        release: row.date(Property::ReleaseDate).map(|(raw, timestamp)| {
            release_date_fields(raw, timestamp, row.text(Property::ReleaseDateType))
        }),
        image,
        game_count,
    }
}
