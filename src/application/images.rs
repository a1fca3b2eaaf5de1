//! Per-entity image resolution.
//!
//! Order: the primary image field, then the background image field, then the thumbnail of the
//! legacy `imageData` block stored in the page text.

use std::sync::Arc;

use gamedex_types::LegacyImage;
use tracing::warn;

use crate::application::repos::PageSource;
use crate::domain::images::{
    DEFAULT_PREFERRED_KEYS, FULL_SIZES, THUMB_SIZES, parse_legacy_image_data,
    resolve_legacy_image, resolve_wiki_image_url,
};
use crate::domain::properties::{Property, PropertyRow, PropertyValue};

pub struct ImageResolver {
    pages: Option<Arc<dyn PageSource>>,
    wiki_base_url: String,
    legacy_host: String,
}

impl ImageResolver {
    pub fn new(
        pages: Option<Arc<dyn PageSource>>,
        wiki_base_url: impl Into<String>,
        legacy_host: impl Into<String>,
    ) -> Self {
        Self {
            pages,
            wiki_base_url: wiki_base_url.into(),
            legacy_host: legacy_host.into(),
        }
    }

    /// Image URL from a structured field of the row.
    pub fn structured_image(&self, row: &PropertyRow, property: Property) -> Option<String> {
        row.values(property).iter().find_map(|value| match value {
            PropertyValue::Page(page) if page.url.starts_with("http") => Some(page.url.clone()),
            PropertyValue::Page(page) => resolve_wiki_image_url(&page.fulltext, &self.wiki_base_url),
            PropertyValue::Text(text) => resolve_wiki_image_url(text, &self.wiki_base_url),
            PropertyValue::Date { .. } => None,
        })
    }

    /// Full and thumbnail picks from the legacy image block of `page`.
    ///
    /// Lookup failures are logged and treated as "no image".
    pub async fn legacy_image(&self, page: &str) -> Option<LegacyImage> {
        let source = self.pages.as_ref()?;
        let text = match source.wikitext(page).await {
            Ok(text) => text?,
            Err(err) => {
                warn!(page, error = %err, "Legacy image lookup failed");
                return None;
            }
        };
        let descriptors = parse_legacy_image_data(&text)?;
        resolve_legacy_image(
            &descriptors,
            &DEFAULT_PREFERRED_KEYS,
            &FULL_SIZES,
            &THUMB_SIZES,
            &self.legacy_host,
        )
    }

    /// Display image for a listing row.
    pub async fn entity_image(&self, row: &PropertyRow) -> Option<String> {
        if let Some(url) = self.structured_image(row, Property::Image) {
            return Some(url);
        }
        if let Some(url) = self.structured_image(row, Property::BackgroundImage) {
            return Some(url);
        }
        self.legacy_image(&row.subject.fulltext)
            .await
            .map(|image| image.thumb)
    }
}
