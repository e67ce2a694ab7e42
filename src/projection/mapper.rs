use super::types::{Fields, IndexEntry, Record, RecordSchema};
use crate::error::{Result, SyncError};
use serde_json::Value;

/// Builds the index entry for `record` according to `schema`.
///
/// The entry always holds every declared field; a field the record lacks is
/// projected as `null` so the entry shape depends on the schema alone.
pub fn project(record: &Record, schema: &RecordSchema) -> Result<IndexEntry> {
    if record.collection != schema.collection {
        return Err(SyncError::Configuration(format!(
            "record {} belongs to '{}' but schema is for '{}'",
            record.id, record.collection, schema.collection
        )));
    }

    let fields: Fields = schema
        .fields
        .iter()
        .map(|name| {
            let value = record.fields.get(name).cloned().unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect();

    Ok(IndexEntry {
        object_id: record.id.clone(),
        fields,
    })
}
