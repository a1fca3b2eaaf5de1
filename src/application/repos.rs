//! Traits describing the property store and page source adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::properties::PropertyRow;
use crate::domain::query::{DataQuery, QueryExpression};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("property store transport error: {0}")]
    Transport(String),
    #[error("property store request timed out")]
    Timeout,
    #[error("property store returned a malformed response: {0}")]
    Decode(String),
    #[error("property store rejected the query ({code}): {info}")]
    Remote { code: String, info: String },
}

impl StoreError {
    pub fn from_transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn from_decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Structured property store queried with filter expressions.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Number of subjects matching the expression.
    async fn count(&self, expression: &QueryExpression) -> Result<u64, StoreError>;

    /// Rows for one window of the matching subjects, in store order.
    async fn query(&self, query: &DataQuery) -> Result<Vec<PropertyRow>, StoreError>;
}

/// Raw page content, used to recover image data embedded by the legacy importer.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Wikitext of `page`, `None` when the page does not exist.
    async fn wikitext(&self, page: &str) -> Result<Option<String>, StoreError>;
}
