//! Shared response shapes for gamedex listings.
//!
//! Every type serializes with camelCase field names so page renderers and JSON endpoints can
//! consume them directly.

use serde::{Deserialize, Serialize};

/// One page of a catalog listing plus the metadata needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// An empty first page. `total_pages` is still 1.
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            current_page: 1,
            total_pages: 1,
            page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_page: self.current_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

/// Granularity at which a release date is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSpecificity {
    Full,
    Month,
    Quarter,
    Year,
    None,
}

/// Release date fields shared by platforms and releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDateFields {
    pub release_date: String,
    pub release_date_timestamp: Option<i64>,
    pub date_specificity: DateSpecificity,
    pub release_date_formatted: String,
}

/// Outcome of the image resolution chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImage {
    pub url: String,
    pub caption: Option<String>,
    pub source_key: String,
}

/// Full and thumbnail picks from a single legacy image descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyImage {
    pub full: String,
    pub thumb: String,
    pub caption: Option<String>,
    pub file: Option<String>,
    pub source_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformLink {
    pub title: String,
    pub url: String,
    pub abbrev: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub search_name: String,
    pub title: String,
    pub image: Option<String>,
    pub platforms: Vec<PlatformLink>,
    pub release_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub url: String,
    pub title: String,
    pub short_name: Option<String>,
    pub deck: Option<String>,
    #[serde(flatten)]
    pub release: Option<ReleaseDateFields>,
    pub image: Option<String>,
    pub game_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub url: String,
    pub title: String,
    pub deck: String,
    pub image: Option<String>,
    pub caption: String,
    pub games: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSummary {
    pub url: String,
    pub title: String,
    pub deck: String,
    pub image: Option<String>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEntry {
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
    #[serde(flatten)]
    pub release: Option<ReleaseDateFields>,
    pub platforms: Vec<PlatformLink>,
    pub region: Option<String>,
    pub image: Option<String>,
}

/// Releases sharing a week, month, quarter or year bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseGroup {
    pub label: String,
    pub sort_key: String,
    pub releases: Vec<ReleaseEntry>,
}

/// Entry of the platform dropdown list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOption {
    pub name: String,
    pub display_name: String,
    pub abbreviation: String,
}
