//! In-process document store.
//!
//! Collections are ordered vectors behind a single `RwLock`; uniqueness checks
//! and the write they guard happen under the same write lock.

use crate::storage::{
    CollectionSpec, Document, DocumentStore, Filter, JsonMap, ObjectId, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collection {
    unique: &'static [&'static str],
    docs: Vec<Document>,
}

impl Collection {
    fn check_unique(
        &self,
        name: &str,
        body: &JsonMap,
        skip: Option<&ObjectId>,
    ) -> Result<(), StoreError> {
        for field in self.unique {
            let Some(value) = body.get(*field) else {
                continue;
            };
            let clash = self
                .docs
                .iter()
                .filter(|d| Some(&d.id) != skip)
                .any(|d| d.get(field) == Some(value));
            if clash {
                return Err(StoreError::Duplicate {
                    collection: name.to_string(),
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    fn position(&self, id: &ObjectId) -> Option<usize> {
        self.docs.iter().position(|d| &d.id == id)
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unknown(collection: &str) -> StoreError {
    StoreError::UnknownCollection(collection.to_string())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(spec.name.to_string())
            .or_default()
            .unique = spec.unique;
        Ok(())
    }

    async fn create(&self, collection: &str, body: JsonMap) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| unknown(collection))?;
        coll.check_unique(collection, &body, None)?;

        let now = Utc::now();
        let doc = Document {
            id: ObjectId::new(),
            body,
            created_at: now,
            updated_at: now,
        };
        coll.docs.push(doc.clone());
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll
            .docs
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll.docs.iter().find(|d| &d.id == id).cloned())
    }

    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        patch: JsonMap,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| unknown(collection))?;
        let Some(idx) = coll.position(id) else {
            return Ok(None);
        };
        coll.check_unique(collection, &patch, Some(id))?;

        let doc = &mut coll.docs[idx];
        doc.body.extend(patch);
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| unknown(collection))?;
        Ok(coll.position(id).map(|idx| coll.docs.remove(idx)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        self.collections.write().await.clear();
    }
}
