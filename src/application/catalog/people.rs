use async_trait::async_trait;
use gamedex_types::PersonSummary;

use super::{CatalogContext, EntityListing, Facet, display_name};
use crate::cache::registry;
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{Category, SortKey};

/// People, filterable by the games they worked on.
pub struct PeopleListing;

#[async_trait]
impl EntityListing for PeopleListing {
    type Item = PersonSummary;

    const PREFIX: &'static str = registry::PEOPLE;
    const ENTITY: &'static str = "people";
    const CATEGORY: Category = Category::People;
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
        Property::Games,
    ];

    async fn map_rows(&self, ctx: &CatalogContext, rows: Vec<PropertyRow>) -> Vec<PersonSummary> {
        let mut people = Vec::with_capacity(rows.len());
        for row in rows {
            let image = ctx.images.entity_image(&row).await;
            people.push(person_summary(&row, image));
        }
        people
    }
}

/// Title, deck and caption shared by people and concepts. Captions default to the title.
pub(crate) fn entity_text(row: &PropertyRow, category: Category) -> (String, String, String) {
    let title = row
        .text(Property::Name)
        .map(str::to_string)
        .unwrap_or_else(|| display_name(&row.subject.fulltext, category));
    let deck = row.text(Property::Deck).unwrap_or_default().to_string();
    let caption = row
        .text(Property::Caption)
        .map(str::to_string)
        .unwrap_or_else(|| title.clone());
    (title, deck, caption)
}

fn person_summary(row: &PropertyRow, image: Option<String>) -> PersonSummary {
    let (title, deck, caption) = entity_text(row, Category::People);
    PersonSummary {
        url: row.subject.url.clone(),
        title,
        deck,
        image,
        caption,
        games: row
            .texts(Property::Games)
            .into_iter()
            .map(|game| game.strip_prefix("Games/").unwrap_or(game).to_string())
            .collect(),
    }
}
