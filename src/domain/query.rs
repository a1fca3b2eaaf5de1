//! Store-neutral query expressions.
//!
//! Services describe what they want as a [`QueryExpression`]; the store adapter renders it into
//! its own query language. Values carried here have already been stripped of query syntax.

use serde::{Deserialize, Serialize};

use super::properties::Property;

/// Content category an entity listing is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Games,
    Platforms,
    People,
    Concepts,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Games => "Games",
            Category::Platforms => "Platforms",
            Category::People => "People",
            Category::Concepts => "Concepts",
        }
    }

    /// Page name prefix of entities in this category, e.g. `Games/`.
    pub fn page_prefix(self) -> String {
        format!("{}/", self.as_str())
    }
}

/// First-character filter on display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterFilter {
    Letter(char),
    /// `#`: names starting with any digit.
    Digit,
}

impl LetterFilter {
    pub const DIGIT_SENTINEL: char = '#';

    /// Parse a caller-supplied letter. Blank input means no filter; anything longer than one
    /// character or outside letters, digits and `#` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let mut chars = value.trim().chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match first {
            Self::DIGIT_SENTINEL => Some(Self::Digit),
            ch if ch.is_ascii_digit() => Some(Self::Digit),
            ch if ch.is_alphanumeric() => Some(Self::Letter(ch.to_ascii_uppercase())),
            _ => None,
        }
    }

    /// Name prefixes this filter accepts.
    pub fn prefixes(self) -> Vec<String> {
        match self {
            LetterFilter::Letter(ch) => vec![ch.to_string()],
            LetterFilter::Digit => ('0'..='9').map(String::from).collect(),
        }
    }

    /// Form used in cache keys.
    pub fn key_value(self) -> String {
        match self {
            LetterFilter::Letter(ch) => ch.to_string(),
            LetterFilter::Digit => Self::DIGIT_SENTINEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Value starts with any of the prefixes (case-insensitive like-match).
    AnyPrefix(Property, Vec<String>),
    /// Value contains the text (case-insensitive like-match).
    Contains(Property, String),
    /// Value matches `*text*` as a plain wildcard.
    Wildcard(Property, String),
    Equals(Property, String),
    /// Value equals any of the alternatives.
    AnyOf(Property, Vec<String>),
    GreaterThan(Property, String),
    LessThan(Property, String),
    /// Subject is not a subobject of a page whose name ends with the suffix.
    NotSubobjectOf(String),
}

/// Category plus conjunctive conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryExpression {
    pub category: Option<Category>,
    pub conditions: Vec<Condition>,
}

impl QueryExpression {
    pub fn in_category(category: Category) -> Self {
        Self {
            category: Some(category),
            conditions: Vec::new(),
        }
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub property: Property,
    pub order: SortOrder,
}

/// Caller-facing sort choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Alphabetical,
    LastEdited,
    LastCreated,
    ReleaseDate,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "alphabetical" => Some(SortKey::Alphabetical),
            "last_edited" => Some(SortKey::LastEdited),
            "last_created" => Some(SortKey::LastCreated),
            "release_date" => Some(SortKey::ReleaseDate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Alphabetical => "alphabetical",
            SortKey::LastEdited => "last_edited",
            SortKey::LastCreated => "last_created",
            SortKey::ReleaseDate => "release_date",
        }
    }

    pub fn directive(self) -> SortDirective {
        let (property, order) = match self {
            SortKey::Alphabetical => (Property::Name, SortOrder::Asc),
            SortKey::LastEdited => (Property::ModificationDate, SortOrder::Desc),
            SortKey::LastCreated => (Property::CreationDate, SortOrder::Desc),
            SortKey::ReleaseDate => (Property::ReleaseDate, SortOrder::Desc),
        };
        SortDirective { property, order }
    }
}

/// Remove sequences with meaning in the store's query syntax from a filter value.
pub fn strip_query_syntax(value: &str) -> String {
    const SPECIAL: [&str; 9] = ["[[", "]]", "[", "]", "|", "::", "*", "{", "}"];
    SPECIAL
        .iter()
        .fold(value.to_string(), |acc, token| acc.replace(token, ""))
        .trim()
        .to_string()
}

/// Filter expression plus sort, window and requested properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuery {
    pub expression: QueryExpression,
    pub sort: Option<SortDirective>,
    pub limit: u32,
    pub offset: u64,
    pub projections: Vec<Property>,
}

impl DataQuery {
    pub fn new(expression: QueryExpression, limit: u32) -> Self {
        Self {
            expression,
            sort: None,
            limit,
            offset: 0,
            projections: Vec::new(),
        }
    }

    pub fn sorted(mut self, sort: SortDirective) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn project(mut self, properties: &[Property]) -> Self {
        self.projections.extend_from_slice(properties);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_parsing() {
        assert_eq!(LetterFilter::parse("a"), Some(LetterFilter::Letter('A')));
        assert_eq!(LetterFilter::parse("#"), Some(LetterFilter::Digit));
        assert_eq!(LetterFilter::parse("7"), Some(LetterFilter::Digit));
        assert_eq!(LetterFilter::parse(""), None);
        assert_eq!(LetterFilter::parse("ab"), None);
        assert_eq!(LetterFilter::parse("|"), None);
        assert_eq!(LetterFilter::Digit.prefixes().len(), 10);
        assert_eq!(LetterFilter::Digit.key_value(), "#");
    }

    #[test]
    fn sort_keys_map_to_directives() {
        let alpha = SortKey::Alphabetical.directive();
        assert_eq!(alpha.property, Property::Name);
        assert_eq!(alpha.order, SortOrder::Asc);

        let edited = SortKey::LastEdited.directive();
        assert_eq!(edited.property, Property::ModificationDate);
        assert_eq!(edited.order, SortOrder::Desc);

        assert_eq!(SortKey::ReleaseDate.directive().property, Property::ReleaseDate);
        assert_eq!(SortKey::parse("last_created"), Some(SortKey::LastCreated));
        assert_eq!(SortKey::parse("popularity"), None);
    }

    #[test]
    fn strips_query_syntax() {
        assert_eq!(strip_query_syntax("[[Halo]]"), "Halo");
        assert_eq!(strip_query_syntax("Games/Halo 3|x::y*{z}"), "Games/Halo 3xyz");
        assert_eq!(strip_query_syntax(" ]] "), "");
    }
}
