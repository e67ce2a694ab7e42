//! In-process providers.
//!
//! `MemoryDocumentStore` stands in for the document store and publishes a change
//! feed; `MemorySearchIndex` stands in for the search provider. Both keep one
//! `DashMap` per collection/index so reads on different keys never contend.

use super::provider::{ChangeSource, DocumentStore, SearchHit, SearchIndex};
use crate::error::Result;
use crate::projection::types::{Fields, IndexEntry, Record};
use crate::sync::types::ChangeEvent;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

type Subscribers = Vec<mpsc::UnboundedSender<ChangeEvent>>;

/// Document store with a lossless change feed.
///
/// Every subscriber owns an unbounded queue, so a slow consumer never misses
/// an event. Writes hold the subscriber lock while mutating, which keeps feed
/// order identical to mutation order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, DashMap<String, Fields>>,
    subscribers: Mutex<Subscribers>,
}

impl MemoryDocumentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Writes a record and publishes `created` or `updated` depending on
    /// whether the key existed.
    pub fn put(&self, collection: &str, key: &str, fields: Fields) -> ChangeEvent {
        let mut subscribers = self.lock_subscribers();
        let previous = self
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), fields.clone());

        let event = match previous {
            Some(before) => ChangeEvent::updated(collection, key, before, fields),
            None => ChangeEvent::created(collection, key, fields),
        };
        publish(&mut subscribers, event.clone());
        event
    }

    /// Removes a record. Removing an absent key publishes nothing.
    pub fn remove(&self, collection: &str, key: &str) -> Option<ChangeEvent> {
        let mut subscribers = self.lock_subscribers();
        let (_, before) = self.collections.get(collection)?.remove(key)?;

        let event = ChangeEvent::deleted(collection, key, Some(before));
        publish(&mut subscribers, event.clone());
        Some(event)
    }

    pub fn get_local(&self, collection: &str, key: &str) -> Option<Record> {
        let fields = self.collections.get(collection)?.get(key)?.value().clone();
        Some(Record::new(collection, key, fields))
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands `event` to every live subscriber and forgets the closed ones.
fn publish(subscribers: &mut Subscribers, event: ChangeEvent) {
    tracing::debug!(
        "Publishing {} event for {}/{}",
        event.kind,
        event.collection,
        event.key
    );
    subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    if subscribers.is_empty() {
        tracing::trace!("Change feed has no subscribers");
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        Ok(self.get_local(collection, key))
    }
}

impl ChangeSource for MemoryDocumentStore {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_subscribers().push(tx);
        rx
    }
}

#[derive(Default)]
pub struct MemorySearchIndex {
    indexes: DashMap<String, DashMap<String, IndexEntry>>,
}

impl MemorySearchIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get_entry(&self, index: &str, key: &str) -> Option<IndexEntry> {
        Some(self.indexes.get(index)?.get(key)?.value().clone())
    }

    pub fn entry_count(&self, index: &str) -> usize {
        self.indexes
            .get(index)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, index: &str, entry: IndexEntry) -> Result<()> {
        self.indexes
            .entry(index.to_string())
            .or_default()
            .insert(entry.object_id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, index: &str, key: &str) -> Result<()> {
        if let Some(entries) = self.indexes.get(index) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn query(&self, index: &str, text: &str, filter: Option<&str>) -> Result<Vec<SearchHit>> {
        let Some(entries) = self.indexes.get(index) else {
            return Ok(Vec::new());
        };

        let needle = text.trim().to_lowercase();
        let clauses = filter.map(parse_filter).unwrap_or_default();

        let mut keys: Vec<String> = entries
            .iter()
            .filter(|entry| matches_text(entry.value(), &needle))
            .filter(|entry| clauses.iter().all(|(f, v)| matches_clause(entry.value(), f, v)))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        Ok(keys
            .into_iter()
            .enumerate()
            .map(|(rank, object_id)| SearchHit { object_id, rank })
            .collect())
    }
}

/// Splits `field:value AND field:value` into its equality clauses.
fn parse_filter(expression: &str) -> Vec<(String, String)> {
    expression
        .split(" AND ")
        .filter_map(|clause| clause.split_once(':'))
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .collect()
}

fn matches_text(entry: &IndexEntry, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    entry.fields.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.to_lowercase().contains(needle)),
        _ => false,
    })
}

fn matches_clause(entry: &IndexEntry, field: &str, expected: &str) -> bool {
    match entry.fields.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(expected)),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => other.to_string() == expected,
        _ => false,
    }
}
