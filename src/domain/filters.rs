//! Caller-supplied listing filters.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::query::{LetterFilter, SortKey, strip_query_syntax};
use crate::cache::KeyParams;

pub const DEFAULT_PAGE_SIZE: u32 = 48;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter, sort and page request for an entity listing.
///
/// Facet values are kept in first-seen order without duplicates. The page size is always in
/// `1..=MAX_PAGE_SIZE`; the page is 1-based and clamped against the real page count later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub letter: Option<LetterFilter>,
    pub search: Option<String>,
    pub facet_values: Vec<String>,
    pub require_all_facets: bool,
    pub sort: Option<SortKey>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            letter: None,
            search: None,
            facet_values: Vec::new(),
            require_all_facets: false,
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_letter(mut self, letter: LetterFilter) -> Self {
        self.letter = Some(letter);
        self
    }

    /// Parse and set a letter filter. Blank input clears it.
    pub fn with_letter_str(mut self, value: &str) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            self.letter = None;
            return Ok(self);
        }
        let letter = LetterFilter::parse(value).ok_or_else(|| {
            DomainError::validation(format!("`{value}` is not a letter, digit or `#`"))
        })?;
        self.letter = Some(letter);
        Ok(self)
    }

    pub fn with_search(mut self, text: &str) -> Self {
        let cleaned = strip_query_syntax(text);
        self.search = (!cleaned.is_empty()).then_some(cleaned);
        self
    }

    pub fn with_facets<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            let cleaned = strip_query_syntax(value.as_ref());
            if !cleaned.is_empty() && !self.facet_values.contains(&cleaned) {
                self.facet_values.push(cleaned);
            }
        }
        self
    }

    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all_facets = require_all;
        self
    }

    pub fn sorted(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_sort_str(mut self, value: &str) -> Result<Self, DomainError> {
        let sort = SortKey::parse(value)
            .ok_or_else(|| DomainError::validation(format!("unknown sort `{value}`")))?;
        self.sort = Some(sort);
        Ok(self)
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Whether the facet filter needs per-value resolution rather than a single alternation.
    pub fn needs_intersection(&self) -> bool {
        self.require_all_facets && self.facet_values.len() > 1
    }

    /// Cache key parameters. `facet_name` labels the facet values and `sort` is the effective
    /// sort after entity defaults are applied.
    pub fn key_params(&self, facet_name: &str, sort: SortKey) -> KeyParams {
        KeyParams::new()
            .with("letter", self.letter.map(LetterFilter::key_value))
            .with("search", self.search.clone())
            .with(facet_name, self.facet_values.clone())
            .with("requireAll", self.needs_intersection())
            .with("sort", sort.as_str())
            .with("page", self.page)
            .with("limit", self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_bounded() {
        assert_eq!(FilterSpec::new().page_size(0).page_size, 1);
        assert_eq!(FilterSpec::new().page_size(500).page_size, MAX_PAGE_SIZE);
        assert_eq!(FilterSpec::new().page(0).page, 1);
    }

    #[test]
    fn facets_are_cleaned_and_deduplicated() {
        let spec = FilterSpec::new().with_facets(["Games/Halo 3", "[[Games/Halo 3]]", " ", "Games/Portal"]);
        assert_eq!(spec.facet_values, vec!["Games/Halo 3", "Games/Portal"]);
    }

    #[test]
    fn intersection_only_for_multiple_required_values() {
        let single = FilterSpec::new().with_facets(["Games/Halo"]).require_all(true);
        assert!(!single.needs_intersection());
        let many = FilterSpec::new()
            .with_facets(["Games/Halo", "Games/Portal"])
            .require_all(true);
        assert!(many.needs_intersection());
    }

    #[test]
    fn invalid_letter_or_sort_is_rejected() {
        assert!(FilterSpec::new().with_letter_str("ab").is_err());
        assert!(FilterSpec::new().with_letter_str("").expect("blank").letter.is_none());
        assert!(FilterSpec::new().with_sort_str("random").is_err());
    }

    #[test]
    fn key_params_compose_sorted_key() {
        let spec = FilterSpec::new()
            .with_letter(LetterFilter::Letter('A'))
            .with_facets(["Games/Halo 3", "Games/Portal"])
            .require_all(true)
            .page(2);
        let key = crate::cache::compose_key("concepts", 3, &spec.key_params("games", SortKey::Alphabetical));
        assert_eq!(
            key,
            "concepts-v3-games_GamesHalo3,GamesPortal-letter_A-limit_48-page_2-requireAll_1-sort_alphabetical"
        );
    }
}
