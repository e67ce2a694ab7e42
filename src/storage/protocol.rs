//! Wire formats.
//!
//! Endpoint constants and DTOs for the Algolia-compatible index REST API and for
//! the document endpoints this service exposes.

use super::provider::SearchHit;
use crate::error::{Result, SyncError};
use reqwest::Url;
use serde::{Deserialize, Serialize};

// --- Index provider API ---

/// Path segments every index resource lives under (`/1/indexes`).
pub const INDEX_API_SEGMENTS: [&str; 2] = ["1", "indexes"];
/// Header carrying the application identifier.
pub const HEADER_APPLICATION_ID: &str = "X-Algolia-Application-Id";
/// Header carrying the write-capable API key.
pub const HEADER_API_KEY: &str = "X-Algolia-API-Key";

/// `{base}/1/indexes/{index}/{objectID}`
pub fn object_url(base: &Url, index: &str, object_id: &str) -> Result<Url> {
    index_url(base, &[index, object_id])
}

/// `{base}/1/indexes/{index}/query`
pub fn query_url(base: &Url, index: &str) -> Result<Url> {
    index_url(base, &[index, "query"])
}

/// Appends the segments to `base`, percent-encoding each one, so an id such
/// as `a/b?c` stays a single segment.
fn index_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::Configuration(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(INDEX_API_SEGMENTS)
        .extend(segments);
    Ok(url)
}

/// Body of a query request.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
}

/// A hit as returned by the provider. Extra projected fields are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub hits: Vec<QueryHit>,
}

impl QueryResponse {
    /// Converts provider hits into ranked `SearchHit`s, keeping their order.
    pub fn into_hits(self) -> Vec<SearchHit> {
        self.hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| SearchHit {
                object_id: hit.object_id,
                rank,
            })
            .collect()
    }
}

// --- Document endpoints ---

/// Public endpoint for reading, writing and deleting documents.
pub const ENDPOINT_DOCUMENTS: &str = "/documents/:collection/:id";

/// Acknowledgement for document writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
    /// Kind of change event the write produced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}
