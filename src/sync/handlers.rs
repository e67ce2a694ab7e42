//! Sync Handlers
//!
//! One stateless transform per (collection, event kind): project the record and
//! upsert it, or delete it by key. Index operations are whole-entry and keyed by
//! identity, so replays and duplicates converge to the same entry. Failures are
//! returned to the caller untouched; there is no local retry or buffering.

use super::registry::SyncHandlerRegistry;
use super::types::{ChangeEvent, ChangeKind, handler_name};
use crate::error::{Result, SyncError};
use crate::projection::mapper::project;
use crate::projection::types::{RecordSchema, SchemaCatalog};
use crate::storage::provider::SearchIndex;

use std::sync::Arc;

pub struct SyncHandler {
    schema: RecordSchema,
    index: Arc<dyn SearchIndex>,
}

impl SyncHandler {
    pub fn new(schema: RecordSchema, index: Arc<dyn SearchIndex>) -> Self {
        Self { schema, index }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// `absent -> present`. A duplicate delivery overwrites with identical content.
    pub async fn on_created(&self, event: &ChangeEvent) -> Result<()> {
        self.upsert_after(event).await
    }

    /// `present -> present`, also accepted from `absent`. The entry is rebuilt
    /// from the full `after` snapshot and replaces the previous one.
    pub async fn on_updated(&self, event: &ChangeEvent) -> Result<()> {
        self.upsert_after(event).await
    }

    /// `present -> absent`. Deleting an absent entry is a no-op at the index.
    pub async fn on_deleted(&self, event: &ChangeEvent) -> Result<()> {
        self.check_collection(event)?;
        self.index
            .delete(&self.schema.index_name, &event.key)
            .await?;

        tracing::debug!(
            "Removed {} from index {}",
            event.key,
            self.schema.index_name
        );
        Ok(())
    }

    /// Routes `event` by its kind.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Created => self.on_created(event).await,
            ChangeKind::Updated => self.on_updated(event).await,
            ChangeKind::Deleted => self.on_deleted(event).await,
        }
    }

    async fn upsert_after(&self, event: &ChangeEvent) -> Result<()> {
        self.check_collection(event)?;
        let record = event
            .after_record()
            .ok_or_else(|| SyncError::InvalidEvent {
                event_id: event.event_id.clone(),
                reason: format!("{} event without an after snapshot", event.kind),
            })?;

        let entry = project(&record, &self.schema)?;
        self.index.upsert(&self.schema.index_name, entry).await?;

        tracing::debug!(
            "Upserted {} into index {} ({})",
            event.key,
            self.schema.index_name,
            event.kind
        );
        Ok(())
    }

    fn check_collection(&self, event: &ChangeEvent) -> Result<()> {
        if event.collection != self.schema.collection {
            return Err(SyncError::Configuration(format!(
                "event for '{}' routed to the '{}' handler",
                event.collection, self.schema.collection
            )));
        }
        Ok(())
    }
}

/// Registers created/updated/deleted handlers for every schema in `catalog`.
pub fn register_sync_handlers(
    registry: &SyncHandlerRegistry,
    catalog: &SchemaCatalog,
    index: Arc<dyn SearchIndex>,
) {
    for schema in catalog.iter() {
        let handler = Arc::new(SyncHandler::new(schema.clone(), index.clone()));

        for kind in ChangeKind::all() {
            let handler = handler.clone();
            registry.register(&handler_name(&schema.collection, kind), move |event| {
                let handler = handler.clone();
                async move { handler.handle(&event).await }
            });
        }
    }
}
