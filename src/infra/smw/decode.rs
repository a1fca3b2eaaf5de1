//! Decoding of Semantic MediaWiki API responses.
//!
//! The API encodes an empty `results` or `printouts` object as `[]`, and date timestamps as
//! either strings or numbers. Result order is the store's sort order and is preserved.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::application::repos::StoreError;
use crate::domain::properties::{PageRef, Property, PropertyKind, PropertyRow, PropertyValue};

/// Entries of a JSON object in document order. An array is read as an empty object.
#[derive(Debug)]
pub struct OrderedEntries<T>(pub Vec<(String, T)>);

impl<T> Default for OrderedEntries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedEntries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = OrderedEntries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object or an empty array")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(OrderedEntries(entries))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                if seq.next_element::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::custom("expected an empty array"));
                }
                Ok(OrderedEntries::default())
            }
        }

        deserializer.deserialize_any(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        StoreError::Remote {
            code: err.code,
            info: err.info,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub query: Option<AskQuery>,
    #[serde(default)]
    pub error: Option<ApiError>,
    /// Offset of the next page, present while more results remain.
    #[serde(rename = "query-continue-offset", default)]
    pub continue_offset: Option<u64>,
}

/// One page of ask results.
#[derive(Debug)]
pub struct AskPage {
    pub subjects: Vec<AskSubject>,
    pub continue_offset: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskQuery {
    #[serde(default)]
    pub results: OrderedEntries<AskSubject>,
}

#[derive(Debug, Deserialize)]
pub struct AskSubject {
    pub fulltext: String,
    #[serde(default)]
    pub fullurl: String,
    #[serde(default)]
    pub displaytitle: Option<String>,
    #[serde(default)]
    pub printouts: OrderedEntries<Vec<Value>>,
}

impl AskResponse {
    pub fn into_page(self) -> Result<AskPage, StoreError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        let subjects = self
            .query
            .unwrap_or_default()
            .results
            .0
            .into_iter()
            .map(|(_, subject)| subject)
            .collect();
        Ok(AskPage {
            subjects,
            continue_offset: self.continue_offset,
        })
    }
}

impl AskSubject {
    /// Typed row. Printouts for properties outside the catalog's set are ignored.
    pub fn into_row(self) -> PropertyRow {
        let mut row = PropertyRow::new(page_ref(self.fulltext, self.fullurl, self.displaytitle));
        for (label, values) in self.printouts.0 {
            let Some(property) = Property::from_label(&label) else {
                continue;
            };
            for value in values {
                if let Some(value) = decode_value(property.kind(), value) {
                    row.push(property, value);
                }
            }
        }
        row
    }
}

fn page_ref(fulltext: String, url: String, display_title: Option<String>) -> PageRef {
    let page = PageRef::new(fulltext, url);
    match display_title.filter(|title| !title.trim().is_empty()) {
        Some(title) => page.with_display_title(title),
        None => page,
    }
}

fn decode_value(kind: PropertyKind, value: Value) -> Option<PropertyValue> {
    match value {
        Value::String(text) if kind == PropertyKind::Date => Some(PropertyValue::Date {
            raw: text,
            timestamp: None,
        }),
        Value::String(text) => Some(PropertyValue::Text(text)),
        Value::Number(number) => Some(PropertyValue::Text(number.to_string())),
        Value::Bool(flag) => Some(PropertyValue::Text(flag.to_string())),
        Value::Object(mut object) => {
            if let Some(Value::String(fulltext)) = object.remove("fulltext") {
                let url = match object.remove("fullurl") {
                    Some(Value::String(url)) => url,
                    _ => String::new(),
                };
                let display = match object.remove("displaytitle") {
                    Some(Value::String(title)) => Some(title),
                    _ => None,
                };
                return Some(PropertyValue::Page(page_ref(fulltext, url, display)));
            }
            if object.contains_key("timestamp") || object.contains_key("raw") {
                let raw = match object.remove("raw") {
                    Some(Value::String(raw)) => raw,
                    _ => String::new(),
                };
                let timestamp = object.remove("timestamp").as_ref().and_then(timestamp);
                return Some(PropertyValue::Date { raw, timestamp });
            }
            None
        }
        Value::Null | Value::Array(_) => None,
    }
}

fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|seconds| seconds as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `action=query&prop=revisions` response with `formatversion=2`.
#[derive(Debug, Deserialize)]
pub struct RevisionsResponse {
    #[serde(default)]
    pub query: Option<RevisionsQuery>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct RevisionsQuery {
    #[serde(default)]
    pub pages: Vec<RevisionPage>,
}

#[derive(Debug, Deserialize)]
pub struct RevisionPage {
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
pub struct Revision {
    pub slots: RevisionSlots,
}

#[derive(Debug, Deserialize)]
pub struct RevisionSlots {
    pub main: RevisionSlot,
}

#[derive(Debug, Deserialize)]
pub struct RevisionSlot {
    #[serde(default)]
    pub content: String,
}

impl RevisionsResponse {
    /// Content of the latest revision, `None` for a missing page.
    pub fn into_content(self) -> Result<Option<String>, StoreError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        Ok(self
            .query
            .and_then(|query| query.pages.into_iter().next())
            .filter(|page| !page.missing)
            .and_then(|page| page.revisions.into_iter().next())
            .map(|revision| revision.slots.main.content))
    }
}
