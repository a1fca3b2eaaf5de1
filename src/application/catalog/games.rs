use std::collections::HashMap;

use async_trait::async_trait;
use gamedex_types::{GameSummary, PlatformLink};

use super::{CatalogContext, EntityListing, Facet, abbreviation_for, display_name};
use crate::cache::registry;
use crate::domain::dates::release_year;
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{Category, Condition, SortKey};

/// Games, searchable by name and filterable by platform.
pub struct GamesListing;

#[async_trait]
impl EntityListing for GamesListing {
    type Item = GameSummary;

    const PREFIX: &'static str = registry::GAMES;
    const ENTITY: &'static str = "games";
    const CATEGORY: Category = Category::Games;
    const FACET: Option<Facet> = Some(Facet {
        property: Property::Platforms,
        key: "platforms",
    });
    const DEFAULT_SORT: SortKey = SortKey::Alphabetical;
    const SORTS: &'static [SortKey] = &[
        SortKey::Alphabetical,
        SortKey::LastEdited,
        SortKey::LastCreated,
        SortKey::ReleaseDate,
    ];
    const PROJECTIONS: &'static [Property] = &[
        Property::Name,
        Property::Image,
        Property::BackgroundImage,
        Property::Platforms,
        Property::ReleaseDate,
    ];

    fn search_condition(&self, text: &str) -> Option<Condition> {
        Some(Condition::Contains(Property::Name, text.to_string()))
    }

    async fn map_rows(&self, ctx: &CatalogContext, rows: Vec<PropertyRow>) -> Vec<GameSummary> {
        let mappings = ctx.directory.mappings().await;
        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            let image = ctx.images.entity_image(&row).await;
            games.push(game_summary(&row, image, &mappings));
        }
        games
    }
}

pub(crate) fn platform_links(
    row: &PropertyRow,
    mappings: &HashMap<String, String>,
) -> Vec<PlatformLink> {
    row.pages(Property::Platforms)
        .map(|page| {
            let title = page.title().to_string();
            PlatformLink {
                abbrev: abbreviation_for(mappings, &title),
                url: page.url.clone(),
                title,
            }
        })
        .collect()
}

fn game_summary(
    row: &PropertyRow,
    image: Option<String>,
    mappings: &HashMap<String, String>,
) -> GameSummary {
    let search_name = row.subject.fulltext.clone();
    let title = row
        .text(Property::Name)
        .map(str::to_string)
        .unwrap_or_else(|| display_name(&search_name, Category::Games));
    GameSummary {
        title,
        image,
        platforms: platform_links(row, mappings),
        release_year: row
            .date(Property::ReleaseDate)
            .and_then(|(_, timestamp)| timestamp)
            .and_then(release_year),
        search_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::properties::{PageRef, PropertyValue};

    #[test]
    fn maps_game_rows() {
        let row = PropertyRow::new(PageRef::new("Games/Halo_3", "/wiki/Games/Halo_3"))
            .with(Property::Name, PropertyValue::Text("Halo 3".to_string()))
            .with(
                Property::Platforms,
                PropertyValue::Page(
                    PageRef::new("Platforms/Xbox 360", "/wiki/Platforms/Xbox_360")
                        .with_display_title("Xbox 360"),
                ),
            )
            .with(
                Property::Platforms,
                PropertyValue::Page(PageRef::new("Platforms/PC", "/wiki/Platforms/PC")),
            )
            .with(
                Property::ReleaseDate,
                PropertyValue::Date {
                    raw: "9/25/2007".to_string(),
                    timestamp: Some(1_190_678_400),
                },
            );
        let mappings = HashMap::from([("Xbox 360".to_string(), "X360".to_string())]);

        let game = game_summary(&row, None, &mappings);
        assert_eq!(game.search_name, "Games/Halo_3");
        assert_eq!(game.title, "Halo 3");
        assert_eq!(game.release_year, Some(2007));
        assert_eq!(game.platforms.len(), 2);
        assert_eq!(game.platforms[0].abbrev, "X360");
        assert_eq!(game.platforms[0].title, "Xbox 360");
        assert_eq!(game.platforms[1].abbrev, "PC");
    }

    #[test]
    fn title_falls_back_to_page_name() {
        let row = PropertyRow::new(PageRef::new("Games/Myst", "/wiki/Games/Myst"));
        let game = game_summary(&row, None, &HashMap::new());
        assert_eq!(game.title, "Myst");
        assert!(game.platforms.is_empty());
        assert_eq!(game.release_year, None);
    }
}
