//! Semantic MediaWiki adapter for the property store and page source seams.

pub mod ask;
mod decode;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::application::repos::{PageSource, PropertyStore, StoreError};
use crate::config::StoreSettings;
use crate::domain::properties::PropertyRow;
use crate::domain::query::{DataQuery, QueryExpression};

use self::decode::{AskPage, AskResponse, AskSubject, RevisionsResponse};
use super::error::InfraError;

#[derive(Clone, Debug)]
pub struct SmwClient {
    client: Client,
    api_url: Url,
    count_limit: u32,
}

impl SmwClient {
    pub fn new(settings: &StoreSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            count_limit: settings.count_limit.get(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("gamedex/", env!("CARGO_PKG_VERSION"))
    }

    async fn call<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, StoreError> {
        let mut url = self.api_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "json");
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(StoreError::Transport(format!("status {status} body {body}")));
        }
        serde_json::from_str(&body).map_err(StoreError::from_decode)
    }

    async fn ask(&self, query: &str) -> Result<AskPage, StoreError> {
        debug!(query, "Running ask query");
        let response: AskResponse = self.call(&[("action", "ask"), ("query", query)]).await?;
        response.into_page()
    }
}

fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::from_transport(err)
    }
}

#[async_trait]
impl PropertyStore for SmwClient {
    /// Pages through the subjects `count_limit` at a time until the store stops continuing.
    #[instrument(skip_all)]
    async fn count(&self, expression: &QueryExpression) -> Result<u64, StoreError> {
        let mut total = 0_u64;
        let mut offset = 0_u64;
        loop {
            let page = self
                .ask(&ask::render_count(expression, self.count_limit, offset))
                .await?;
            total += page.subjects.len() as u64;
            match page.continue_offset {
                Some(next) if next > offset && !page.subjects.is_empty() => offset = next,
                _ => break,
            }
        }
        debug!(total, "Counted subjects");
        Ok(total)
    }

    #[instrument(skip_all, fields(limit = query.limit, offset = query.offset))]
    async fn query(&self, query: &DataQuery) -> Result<Vec<PropertyRow>, StoreError> {
        let page = self.ask(&ask::render_query(query)).await?;
        Ok(page.subjects.into_iter().map(AskSubject::into_row).collect())
    }
}

#[async_trait]
impl PageSource for SmwClient {
    async fn wikitext(&self, page: &str) -> Result<Option<String>, StoreError> {
        let response: RevisionsResponse = self
            .call(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("formatversion", "2"),
                ("titles", page),
            ])
            .await?;
        response.into_content()
    }
}
