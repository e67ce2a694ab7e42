use super::filter::build_filter;
use crate::error::{Result, SyncError};
use crate::projection::types::{Record, RecordSchema, SchemaCatalog};
use crate::storage::provider::{DocumentStore, SearchIndex};

use futures::future::try_join_all;
use std::sync::Arc;

/// Search-then-hydrate read path.
pub struct SearchService {
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn DocumentStore>,
    catalog: SchemaCatalog,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn DocumentStore>,
        catalog: SchemaCatalog,
    ) -> Self {
        Self {
            index,
            store,
            catalog,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Queries the collection's index and returns the matching records in
    /// the index's ranking order.
    ///
    /// Zero hits returns an empty list without reading the document store.
    /// Hits whose record no longer exists are left out.
    pub async fn search(
        &self,
        query_text: &str,
        filter: Option<&str>,
        collection: &str,
    ) -> Result<Vec<Record>> {
        let schema = self.schema(collection)?;

        let hits = self
            .index
            .query(&schema.index_name, query_text, filter)
            .await?;
        let keys: Vec<String> = hits.into_iter().map(|hit| hit.object_id).collect();

        tracing::debug!(
            "Query '{}' on {} returned {} hits",
            query_text,
            schema.index_name,
            keys.len()
        );

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        hydrate(self.store.as_ref(), collection, &keys).await
    }

    /// Like `search`, restricted to records carrying every category in
    /// the `;`-separated `categories` list.
    pub async fn search_by_categories(
        &self,
        query_text: &str,
        categories: &str,
        collection: &str,
    ) -> Result<Vec<Record>> {
        let field = self.schema(collection)?.filter_field.clone().ok_or_else(|| {
            SyncError::Configuration(format!("collection '{}' has no filter field", collection))
        })?;

        let filter = build_filter(&field, categories);
        self.search(query_text, Some(&filter), collection).await
    }

    fn schema(&self, collection: &str) -> Result<&RecordSchema> {
        self.catalog.get(collection).ok_or_else(|| {
            SyncError::Configuration(format!("unknown collection '{}'", collection))
        })
    }
}

/// Resolves `keys` against the document store, issuing every lookup at once.
///
/// The output follows the order of `keys`; keys without a record are omitted.
/// The first failed lookup fails the whole call.
pub async fn hydrate(
    store: &dyn DocumentStore,
    collection: &str,
    keys: &[String],
) -> Result<Vec<Record>> {
    let lookups = keys.iter().map(|key| store.get(collection, key));
    let found = try_join_all(lookups).await?;

    let records: Vec<Record> = found.into_iter().flatten().collect();
    if records.len() < keys.len() {
        tracing::debug!(
            "{} of {} hits in {} have no record",
            keys.len() - records.len(),
            keys.len(),
            collection
        );
    }

    Ok(records)
}
