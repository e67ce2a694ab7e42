use crate::projection::types::{Fields, Record};
use serde::{Deserialize, Serialize};

/// Kind of mutation a change notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }

    pub fn all() -> [ChangeKind; 3] {
        [ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification emitted by the document store.
///
/// `after` is present for created and updated events, `before` for updated
/// and deleted events. Delivery is at-least-once, so the same event may
/// arrive more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_id: String,
    pub collection: String,
    pub key: String,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Fields>,
}

impl ChangeEvent {
    pub fn created(collection: &str, key: &str, after: Fields) -> Self {
        Self::build(collection, key, ChangeKind::Created, None, Some(after))
    }

    pub fn updated(collection: &str, key: &str, before: Fields, after: Fields) -> Self {
        Self::build(collection, key, ChangeKind::Updated, Some(before), Some(after))
    }

    pub fn deleted(collection: &str, key: &str, before: Option<Fields>) -> Self {
        Self::build(collection, key, ChangeKind::Deleted, before, None)
    }

    fn build(
        collection: &str,
        key: &str,
        kind: ChangeKind,
        before: Option<Fields>,
        after: Option<Fields>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            collection: collection.to_string(),
            key: key.to_string(),
            kind,
            before,
            after,
        }
    }

    /// Registry name of the handler responsible for this event.
    pub fn handler_name(&self) -> String {
        handler_name(&self.collection, self.kind)
    }

    /// The record as it exists after the change, if the event carries it.
    pub fn after_record(&self) -> Option<Record> {
        self.after
            .as_ref()
            .map(|fields| Record::new(self.collection.clone(), self.key.clone(), fields.clone()))
    }
}

/// Handler names follow `<collection>.<kind>`, e.g. `questions.created`.
pub fn handler_name(collection: &str, kind: ChangeKind) -> String {
    format!("{}.{}", collection, kind)
}
