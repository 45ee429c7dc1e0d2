//! Domain model definitions: entity schemas and the uniform CRUD adapter over them.

use crate::storage::{CollectionSpec, InvalidObjectId, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub mod adapter;
pub mod registry;
pub mod schemas;

pub use adapter::Model;
pub use registry::{ModelRegistry, Resource, UnknownResource};
pub use schemas::{Category, CategoryPatch, CategorySchema, Product, ProductPatch, ProductSchema};

/// A relation computed at read time: every document in `foreign_collection`
/// whose `foreign_key` equals this document's `local_key`, exposed as `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub local_key: &'static str,
    pub foreign_collection: &'static str,
    pub foreign_key: &'static str,
}

/// Trait that defines the contract for any entity schema.
///
/// The adapter works with any schema without knowing its fields. Each schema provides:
/// - the collection it lives in and its unique fields
/// - typed create and patch payloads (deserialisation is the type validation)
/// - optional range checks and read-time relations
pub trait EntitySchema: Send + Sync + 'static {
    /// Full payload accepted on create.
    type Record: DeserializeOwned + Serialize + Send;
    /// Partial payload accepted on update.
    type Patch: DeserializeOwned + Serialize + Send;

    fn collection(&self) -> CollectionSpec;

    /// Checks beyond what the types express. Returns the failure message.
    fn check_record(&self, _record: &Self::Record) -> Result<(), String> {
        Ok(())
    }

    fn check_patch(&self, _patch: &Self::Patch) -> Result<(), String> {
        Ok(())
    }

    fn relations(&self) -> &'static [Relation] {
        &[]
    }
}

/// Failure value returned (never thrown) by the adapter.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    InvalidId(#[from] InvalidObjectId),

    #[error("{collection} validation failed: {message}")]
    Validation { collection: String, message: String },

    #[error("{0}")]
    Duplicate(StoreError),

    #[error("{0}")]
    Store(StoreError),
}

impl From<StoreError> for ModelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => ModelError::Duplicate(err),
            other => ModelError::Store(other),
        }
    }
}

impl ModelError {
    /// True when the failure came from the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ModelError::Store(_))
    }
}

/// Result of an adapter operation addressing a single entity by identity.
#[derive(Debug)]
pub enum Outcome<T> {
    Found(T),
    /// Well-formed identity, no matching entity.
    NotFound,
    Failed(ModelError),
}

impl<T> Outcome<T> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ModelError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<Result<Option<T>, ModelError>> for Outcome<T> {
    fn from(result: Result<Option<T>, ModelError>) -> Self {
        match result {
            Ok(Some(v)) => Outcome::Found(v),
            Ok(None) => Outcome::NotFound,
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Uniform CRUD capability shared by every registered entity.
///
/// Entities travel as JSON documents (`_id`, fields, timestamps, populated relations).
#[async_trait]
pub trait CrudModel: Send + Sync {
    fn collection(&self) -> CollectionSpec;

    async fn create(&self, record: JsonValue) -> Result<JsonValue, ModelError>;

    async fn read(&self) -> Result<Vec<JsonValue>, ModelError>;

    async fn read_one(&self, id: &str) -> Outcome<JsonValue>;

    async fn update(&self, id: &str, patch: JsonValue) -> Outcome<JsonValue>;

    async fn delete(&self, id: &str) -> Outcome<JsonValue>;
}
