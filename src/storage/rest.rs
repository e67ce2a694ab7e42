//! HTTP client for an Algolia-compatible search provider.

use super::protocol::*;
use super::provider::{SearchHit, SearchIndex};
use crate::error::{Result, SyncError};
use crate::projection::types::IndexEntry;

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub struct RestSearchIndex {
    http_client: reqwest::Client,
    base_url: Url,
    application_id: String,
    api_key: String,
    timeout: Duration,
}

impl RestSearchIndex {
    pub fn new(base_url: &str, application_id: &str, api_key: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            SyncError::Configuration(format!("invalid index URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Configuration(format!(
                "index URL '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            http_client: reqwest::Client::new(),
            base_url,
            application_id: application_id.to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn object_url(&self, index: &str, object_id: &str) -> Result<Url> {
        object_url(&self.base_url, index, object_id)
    }

    pub fn query_url(&self, index: &str) -> Result<Url> {
        query_url(&self.base_url, index)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header(HEADER_APPLICATION_ID, &self.application_id)
            .header(HEADER_API_KEY, &self.api_key)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl SearchIndex for RestSearchIndex {
    async fn upsert(&self, index: &str, entry: IndexEntry) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, self.object_url(index, &entry.object_id)?)
            .json(&entry)
            .send()
            .await
            .map_err(SyncError::index)?;

        if !response.status().is_success() {
            return Err(SyncError::index(format!(
                "upsert of {} into {} failed: {}",
                entry.object_id,
                index,
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete(&self, index: &str, key: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, self.object_url(index, key)?)
            .send()
            .await
            .map_err(SyncError::index)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("Delete of {} from {}: already absent", key, index);
            return Ok(());
        }
        if !status.is_success() {
            return Err(SyncError::index(format!(
                "delete of {} from {} failed: {}",
                key, index, status
            )));
        }
        Ok(())
    }

    async fn query(&self, index: &str, text: &str, filter: Option<&str>) -> Result<Vec<SearchHit>> {
        let payload = QueryRequest {
            query: text.to_string(),
            filters: filter.map(str::to_string),
        };

        let response = self
            .request(reqwest::Method::POST, self.query_url(index)?)
            .json(&payload)
            .send()
            .await
            .map_err(SyncError::index)?;

        if !response.status().is_success() {
            return Err(SyncError::index(format!(
                "query on {} failed: {}",
                index,
                response.status()
            )));
        }

        let body: QueryResponse = response.json().await.map_err(SyncError::index)?;
        Ok(body.into_hits())
    }
}
