//! Contracts of the two external collaborators.
//!
//! The document store is the source of truth; the search index is a derived,
//! disposable cache of projections. Both are shared across every handler
//! invocation, hence `Send + Sync` trait objects.

use crate::error::Result;
use crate::projection::types::{IndexEntry, Record};
use crate::sync::types::ChangeEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One match returned by the index, in relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    /// Position in the provider's ranking, starting at 0.
    #[serde(default)]
    pub rank: usize,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one record. `Ok(None)` means the key does not exist.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>>;
}

/// A document store that can also publish its mutations.
pub trait ChangeSource: Send + Sync {
    /// Opens a feed receiving every mutation from now on, in mutation order.
    /// The feed is lossless: events queue until the subscriber reads them.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeEvent>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Replaces the entry with the same `objectID`, creating it if absent.
    async fn upsert(&self, index: &str, entry: IndexEntry) -> Result<()>;

    /// Removes the entry for `key`. Removing an absent key succeeds.
    async fn delete(&self, index: &str, key: &str) -> Result<()>;

    /// Runs a query and returns hits in the provider's ranking order.
    async fn query(&self, index: &str, text: &str, filter: Option<&str>) -> Result<Vec<SearchHit>>;
}
