//! Typed view of property store rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Closed set of properties the catalog reads or filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Name,
    ShortName,
    Deck,
    Image,
    BackgroundImage,
    Caption,
    Games,
    Platforms,
    ReleaseDate,
    ReleaseDateType,
    Region,
    ObjectType,
    Subobject,
    ModificationDate,
    CreationDate,
}

/// How values of a property are encoded by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Page,
    Date,
}

impl Property {
    pub const ALL: [Property; 15] = [
        Property::Name,
        Property::ShortName,
        Property::Deck,
        Property::Image,
        Property::BackgroundImage,
        Property::Caption,
        Property::Games,
        Property::Platforms,
        Property::ReleaseDate,
        Property::ReleaseDateType,
        Property::Region,
        Property::ObjectType,
        Property::Subobject,
        Property::ModificationDate,
        Property::CreationDate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Property::Name => "Has name",
            Property::ShortName => "Has short name",
            Property::Deck => "Has deck",
            Property::Image => "Has image",
            Property::BackgroundImage => "Has background image",
            Property::Caption => "Has caption",
            Property::Games => "Has games",
            Property::Platforms => "Has platforms",
            Property::ReleaseDate => "Has release date",
            Property::ReleaseDateType => "Has release date type",
            Property::Region => "Has region",
            Property::ObjectType => "Has object type",
            Property::Subobject => "Has subobject",
            Property::ModificationDate => "Modification date",
            Property::CreationDate => "Creation date",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|property| property.label() == label)
    }

    pub fn kind(self) -> PropertyKind {
        match self {
            Property::Image
            | Property::BackgroundImage
            | Property::Games
            | Property::Platforms
            | Property::Subobject => PropertyKind::Page,
            Property::ReleaseDate | Property::ModificationDate | Property::CreationDate => {
                PropertyKind::Date
            }
            _ => PropertyKind::Text,
        }
    }
}

/// Reference to a wiki page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Full page name including namespace-like prefixes such as `Games/`.
    pub fulltext: String,
    pub url: String,
    pub display_title: Option<String>,
}

impl PageRef {
    pub fn new(fulltext: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            fulltext: fulltext.into(),
            url: url.into(),
            display_title: None,
        }
    }

    pub fn with_display_title(mut self, title: impl Into<String>) -> Self {
        self.display_title = Some(title.into());
        self
    }

    /// Display title when the page has one, the page name otherwise.
    pub fn title(&self) -> &str {
        self.display_title.as_deref().unwrap_or(&self.fulltext)
    }

    /// Page name without its leading `Prefix/`.
    pub fn basename(&self) -> &str {
        basename(&self.fulltext)
    }
}

/// Last path segment of a page name.
pub fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Page(PageRef),
    Date { raw: String, timestamp: Option<i64> },
}

/// One result row: the subject page plus the values of each requested property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub subject: PageRef,
    values: HashMap<Property, Vec<PropertyValue>>,
}

impl PropertyRow {
    pub fn new(subject: PageRef) -> Self {
        Self {
            subject,
            values: HashMap::new(),
        }
    }

    pub fn push(&mut self, property: Property, value: PropertyValue) {
        self.values.entry(property).or_default().push(value);
    }

    pub fn with(mut self, property: Property, value: PropertyValue) -> Self {
        self.push(property, value);
        self
    }

    pub fn values(&self, property: Property) -> &[PropertyValue] {
        self.values.get(&property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First non-empty textual value. Page values yield their page name.
    pub fn text(&self, property: Property) -> Option<&str> {
        self.texts(property).into_iter().next()
    }

    pub fn texts(&self, property: Property) -> Vec<&str> {
        self.values(property)
            .iter()
            .filter_map(|value| match value {
                PropertyValue::Text(text) => Some(text.as_str()),
                PropertyValue::Page(page) => Some(page.fulltext.as_str()),
                PropertyValue::Date { raw, .. } => Some(raw.as_str()),
            })
            .filter(|text| !text.trim().is_empty())
            .collect()
    }

    pub fn page(&self, property: Property) -> Option<&PageRef> {
        self.pages(property).next()
    }

    pub fn pages(&self, property: Property) -> impl Iterator<Item = &PageRef> {
        self.values(property).iter().filter_map(|value| match value {
            PropertyValue::Page(page) => Some(page),
            _ => None,
        })
    }

    /// First date value as `(raw, timestamp)`.
    pub fn date(&self, property: Property) -> Option<(&str, Option<i64>)> {
        self.values(property).iter().find_map(|value| match value {
            PropertyValue::Date { raw, timestamp } => Some((raw.as_str(), *timestamp)),
            _ => None,
        })
    }
}
