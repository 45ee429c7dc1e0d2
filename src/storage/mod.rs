//! Document store used by the model adapters.
//!
//! Documents are schemaless JSON objects addressed by an [`ObjectId`]; the store
//! assigns identity and timestamps, enforces declared unique fields, and keeps
//! collections in insertion order.

pub mod memory;
pub mod object_id;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use object_id::{InvalidObjectId, ObjectId};
pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub type JsonMap = Map<String, JsonValue>;

/// Declares a collection and the fields whose values must be unique within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub unique: &'static [&'static str],
}

/// A stored document.
///
/// Serialises as `{"_id": ..., <fields>, "createdAt": ..., "updatedAt": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(flatten)]
    pub body: JsonMap,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.body.get(field)
    }

    pub fn into_json(self) -> JsonValue {
        let mut out = JsonMap::with_capacity(self.body.len() + 3);
        out.insert("_id".to_string(), JsonValue::from(self.id.to_hex()));
        out.extend(self.body);
        out.insert(
            "createdAt".to_string(),
            JsonValue::from(self.created_at.to_rfc3339()),
        );
        out.insert(
            "updatedAt".to_string(),
            JsonValue::from(self.updated_at.to_rfc3339()),
        );
        JsonValue::Object(out)
    }
}

/// Conjunction of top-level field equality matches. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: JsonMap,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    pub fn as_json(&self) -> JsonValue {
        JsonValue::Object(self.fields.clone())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("E11000 duplicate key error collection: {collection} dup key: {{ {field}: {value} }}")]
    Duplicate {
        collection: String,
        field: String,
        value: JsonValue,
    },

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("corrupt document in '{collection}': {reason}")]
    Corrupt { collection: String, reason: String },

    #[error("store backend failure: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Persistence surface consumed by the model adapters.
///
/// Implementations are shared across concurrent requests; each call is
/// independent and writes race with last-write-wins semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the collection (and its unique indexes) if it does not exist yet.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError>;

    async fn create(&self, collection: &str, body: JsonMap) -> Result<Document, StoreError>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError>;

    /// Shallow-merges `patch` into the document and returns it *after* the update.
    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        patch: JsonMap,
    ) -> Result<Option<Document>, StoreError>;

    /// Removes the document and returns it as it was before removal.
    async fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self);
}
