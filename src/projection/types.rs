use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field values of a record, as stored in the document store.
pub type Fields = Map<String, Value>;

/// A canonical domain entity (a question, a user) owned by the document store.
///
/// Serializes as one flat object: `id` followed by the stored fields. A stored
/// field named `id` is left out so the store key is the only `id` in the output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(skip)]
    pub collection: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields,
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shadowed = usize::from(self.fields.contains_key("id"));
        let mut map = serializer.serialize_map(Some(1 + self.fields.len() - shadowed))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in self.fields.iter().filter(|(name, _)| name.as_str() != "id") {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The projected subset of a record held by the search index.
///
/// Serializes as a flat JSON object with the identity under `objectID`,
/// which is the shape index providers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Field selection for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Document store collection the records live in.
    pub collection: String,
    /// Name of the index the projections are written to.
    pub index_name: String,
    /// Fields copied into the index entry.
    pub fields: Vec<String>,
    /// Field category filters apply to, if the collection supports filtering.
    pub filter_field: Option<String>,
}

impl RecordSchema {
    pub fn new(collection: &str, index_name: &str, fields: &[&str]) -> Self {
        Self {
            collection: collection.to_string(),
            index_name: index_name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            filter_field: None,
        }
    }

    pub fn with_filter_field(mut self, field: &str) -> Self {
        self.filter_field = Some(field.to_string());
        self
    }

    pub fn questions(index_name: &str) -> Self {
        Self::new(
            "questions",
            index_name,
            &["question", "description", "categories"],
        )
        .with_filter_field("categories")
    }

    pub fn users(index_name: &str) -> Self {
        Self::new("users", index_name, &["displayName"])
    }
}

/// Schemas of every synchronized collection, keyed by collection name.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<String, RecordSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, schema: RecordSchema) -> Self {
        self.schemas.insert(schema.collection.clone(), schema);
        self
    }

    pub fn get(&self, collection: &str) -> Option<&RecordSchema> {
        self.schemas.get(collection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
