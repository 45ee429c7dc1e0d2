//! Generic CRUD adapter over one entity schema.
//!
//! Every failure is caught, logged, and returned as a value: `Outcome::NotFound`
//! for a well-formed identity with no entity, `ModelError` for everything else.

use crate::domain::model::{CrudModel, EntitySchema, ModelError, Outcome};
use crate::storage::{CollectionSpec, Document, DocumentStore, Filter, JsonMap, ObjectId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub struct Model<S: EntitySchema> {
    schema: S,
    store: Arc<dyn DocumentStore>,
}

impl<S: EntitySchema> Model<S> {
    pub fn new(schema: S, store: Arc<dyn DocumentStore>) -> Self {
        Self { schema, store }
    }

    fn name(&self) -> &'static str {
        self.schema.collection().name
    }

    fn invalid(&self, message: impl Into<String>) -> ModelError {
        ModelError::Validation {
            collection: self.name().to_string(),
            message: message.into(),
        }
    }

    fn log_failure(&self, op: &'static str, err: &ModelError) {
        if err.is_client_error() {
            tracing::warn!(collection = self.name(), op, error = %err, "model operation rejected");
        } else {
            tracing::error!(collection = self.name(), op, error = %err, "model operation failed");
        }
    }

    fn parse_id(&self, id: &str) -> Result<ObjectId, ModelError> {
        Ok(id.parse::<ObjectId>()?)
    }

    fn to_body<T: Serialize>(&self, value: &T) -> Result<JsonMap, ModelError> {
        match serde_json::to_value(value) {
            Ok(JsonValue::Object(map)) => Ok(map),
            Ok(other) => Err(self.invalid(format!("expected an object, got {}", other))),
            Err(e) => Err(self.invalid(e.to_string())),
        }
    }

    fn validate_record(&self, record: JsonValue) -> Result<JsonMap, ModelError> {
        let typed: S::Record =
            serde_json::from_value(record).map_err(|e| self.invalid(e.to_string()))?;
        self.schema
            .check_record(&typed)
            .map_err(|m| self.invalid(m))?;
        self.to_body(&typed)
    }

    fn validate_patch(&self, patch: JsonValue) -> Result<JsonMap, ModelError> {
        let typed: S::Patch =
            serde_json::from_value(patch).map_err(|e| self.invalid(e.to_string()))?;
        self.schema
            .check_patch(&typed)
            .map_err(|m| self.invalid(m))?;
        self.to_body(&typed)
    }

    /// Renders a document and joins its read-time relations.
    ///
    /// Relations are recomputed on every call; nothing is cached.
    async fn populate(&self, doc: Document) -> Result<JsonValue, ModelError> {
        let relations = self.schema.relations();
        let keys: Vec<Option<JsonValue>> = relations
            .iter()
            .map(|rel| doc.get(rel.local_key).cloned())
            .collect();

        let mut out = doc.into_json();
        for (rel, key) in relations.iter().zip(keys) {
            let related = match key {
                Some(key) => {
                    self.store
                        .find(rel.foreign_collection, &Filter::all().where_eq(rel.foreign_key, key))
                        .await?
                }
                None => Vec::new(),
            };
            if let JsonValue::Object(map) = &mut out {
                map.insert(
                    rel.field.to_string(),
                    JsonValue::Array(related.into_iter().map(Document::into_json).collect()),
                );
            }
        }
        Ok(out)
    }

    async fn try_create(&self, record: JsonValue) -> Result<JsonValue, ModelError> {
        let body = self.validate_record(record)?;
        let doc = self.store.create(self.name(), body).await?;
        Ok(doc.into_json())
    }

    async fn try_read(&self) -> Result<Vec<JsonValue>, ModelError> {
        let docs = self.store.find(self.name(), &Filter::all()).await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            out.push(self.populate(doc).await?);
        }
        Ok(out)
    }

    async fn try_read_one(&self, id: &str) -> Result<Option<JsonValue>, ModelError> {
        let id = self.parse_id(id)?;
        match self.store.find_by_id(self.name(), &id).await? {
            Some(doc) => Ok(Some(self.populate(doc).await?)),
            None => Ok(None),
        }
    }

    async fn try_update(&self, id: &str, patch: JsonValue) -> Result<Option<JsonValue>, ModelError> {
        let id = self.parse_id(id)?;
        let patch = self.validate_patch(patch)?;
        let doc = self
            .store
            .find_by_id_and_update(self.name(), &id, patch)
            .await?;
        Ok(doc.map(Document::into_json))
    }

    async fn try_delete(&self, id: &str) -> Result<Option<JsonValue>, ModelError> {
        let id = self.parse_id(id)?;
        let doc = self.store.find_by_id_and_delete(self.name(), &id).await?;
        Ok(doc.map(Document::into_json))
    }

    fn settle(&self, op: &'static str, result: Result<Option<JsonValue>, ModelError>) -> Outcome<JsonValue> {
        if let Err(e) = &result {
            self.log_failure(op, e);
        }
        result.into()
    }
}

#[async_trait]
impl<S: EntitySchema> CrudModel for Model<S> {
    fn collection(&self) -> CollectionSpec {
        self.schema.collection()
    }

    async fn create(&self, record: JsonValue) -> Result<JsonValue, ModelError> {
        let result = self.try_create(record).await;
        if let Err(e) = &result {
            self.log_failure("create", e);
        }
        result
    }

    async fn read(&self) -> Result<Vec<JsonValue>, ModelError> {
        let result = self.try_read().await;
        if let Err(e) = &result {
            self.log_failure("read", e);
        }
        result
    }

    async fn read_one(&self, id: &str) -> Outcome<JsonValue> {
        let result = self.try_read_one(id).await;
        self.settle("read_one", result)
    }

    async fn update(&self, id: &str, patch: JsonValue) -> Outcome<JsonValue> {
        let result = self.try_update(id, patch).await;
        self.settle("update", result)
    }

    async fn delete(&self, id: &str) -> Outcome<JsonValue> {
        let result = self.try_delete(id).await;
        self.settle("delete", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CategorySchema, ProductSchema};
    use crate::storage::{MemoryDocumentStore, StoreError};
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    const ABSENT_ID: &str = "5e926a2a17c00458508ad631";
    const MALFORMED_ID: &str = "5e926a2a17c00458508ad63";

    async fn models() -> (Model<CategorySchema>, Model<ProductSchema>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let categories = Model::new(CategorySchema, store.clone());
        let products = Model::new(ProductSchema, store.clone());
        store.ensure_collection(&categories.collection()).await.unwrap();
        store.ensure_collection(&products.collection()).await.unwrap();
        (categories, products)
    }

    /// Formatted log output collected for one test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines_with(&self, needle: &str) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .filter(|l| l.contains(needle))
                .map(str::to_string)
                .collect()
        }
    }

    // The guard scopes the subscriber to this thread; `#[tokio::test]` stays on it.
    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    /// Accepts collection setup, fails every data call.
    struct FailingStore;

    fn corrupt(collection: &str) -> StoreError {
        StoreError::Corrupt {
            collection: collection.to_string(),
            reason: "disk on fire".to_string(),
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn ensure_collection(&self, _spec: &CollectionSpec) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create(&self, collection: &str, _body: JsonMap) -> Result<Document, StoreError> {
            Err(corrupt(collection))
        }

        async fn find(&self, collection: &str, _filter: &Filter) -> Result<Vec<Document>, StoreError> {
            Err(corrupt(collection))
        }

        async fn find_by_id(
            &self,
            collection: &str,
            _id: &ObjectId,
        ) -> Result<Option<Document>, StoreError> {
            Err(corrupt(collection))
        }

        async fn find_by_id_and_update(
            &self,
            collection: &str,
            _id: &ObjectId,
            _patch: JsonMap,
        ) -> Result<Option<Document>, StoreError> {
            Err(corrupt(collection))
        }

        async fn find_by_id_and_delete(
            &self,
            collection: &str,
            _id: &ObjectId,
        ) -> Result<Option<Document>, StoreError> {
            Err(corrupt(collection))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(corrupt("*"))
        }

        async fn close(&self) {}
    }

    fn id_of(v: &JsonValue) -> String {
        v["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_then_read_one_returns_the_input_fields() {
        let (categories, _) = models().await;
        let created = categories
            .create(json!({"name": "test category", "displayName": "Test"}))
            .await
            .unwrap();
        assert_eq!(created["name"], "test category");

        let read = categories.read_one(&id_of(&created)).await.found().unwrap();
        assert_eq!(read["_id"], created["_id"]);
        assert_eq!(read["name"], "test category");
        assert_eq!(read["displayName"], "Test");
        assert!(read["createdAt"].is_string());
    }

    #[tokio::test]
    async fn create_rejects_missing_required_fields() {
        let (categories, products) = models().await;
        let err = categories.create(json!({})).await.unwrap_err();
        assert!(matches!(err, ModelError::Validation { .. }));
        assert!(products.create(json!({"name": "saw"})).await.is_err());
    }

    #[tokio::test]
    async fn read_reports_every_created_entity() {
        let (categories, _) = models().await;
        assert!(categories.read().await.unwrap().is_empty());
        for name in ["a", "b", "c"] {
            categories.create(json!({ "name": name })).await.unwrap();
        }
        let all = categories.read().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["name"], "a");
    }

    #[tokio::test]
    async fn absent_ids_are_not_found() {
        let (categories, _) = models().await;
        assert!(categories.read_one(ABSENT_ID).await.is_not_found());
        assert!(categories
            .update(ABSENT_ID, json!({"name": "x"}))
            .await
            .is_not_found());
        assert!(categories.delete(ABSENT_ID).await.is_not_found());
    }

    #[tokio::test]
    async fn malformed_ids_are_errors() {
        let (categories, _) = models().await;
        for outcome in [
            categories.read_one(MALFORMED_ID).await,
            categories.update(MALFORMED_ID, json!({"name": "x"})).await,
            categories.delete(MALFORMED_ID).await,
        ] {
            assert!(matches!(outcome.error(), Some(ModelError::InvalidId(_))));
        }
    }

    #[tokio::test]
    async fn each_malformed_id_logs_one_warning() {
        let (categories, _) = models().await;
        let (logs, _guard) = capture_logs();

        categories.read_one(MALFORMED_ID).await;
        categories.update(MALFORMED_ID, json!({"name": "x"})).await;
        categories.delete(MALFORMED_ID).await;

        let rejected = logs.lines_with("model operation rejected");
        assert_eq!(rejected.len(), 3, "{:?}", rejected);
        for (line, op) in rejected.iter().zip(["read_one", "update", "delete"]) {
            assert!(line.contains("WARN"), "{}", line);
            assert!(line.contains(op), "{}", line);
            assert!(line.contains(MALFORMED_ID), "{}", line);
        }
        assert!(logs.lines_with("ERROR").is_empty());
    }

    #[tokio::test]
    async fn validation_failures_are_logged() {
        let (categories, _) = models().await;
        let (logs, _guard) = capture_logs();

        categories.create(json!({})).await.unwrap_err();

        let rejected = logs.lines_with("model operation rejected");
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].contains("create"));
    }

    #[tokio::test]
    async fn store_failures_are_errors_and_logged() {
        let categories = Model::new(CategorySchema, Arc::new(FailingStore));
        let (logs, _guard) = capture_logs();

        assert!(matches!(categories.read().await, Err(ModelError::Store(_))));
        let err = categories
            .create(json!({"name": "tools"}))
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
        for outcome in [
            categories.read_one(ABSENT_ID).await,
            categories.update(ABSENT_ID, json!({"name": "x"})).await,
            categories.delete(ABSENT_ID).await,
        ] {
            assert!(matches!(outcome.error(), Some(ModelError::Store(_))));
        }

        let failed = logs.lines_with("model operation failed");
        assert_eq!(failed.len(), 5, "{:?}", failed);
        assert!(failed.iter().all(|l| l.contains("ERROR") && l.contains("disk on fire")));
    }

    #[tokio::test]
    async fn update_returns_the_entity_after_the_change() {
        let (categories, _) = models().await;
        let created = categories.create(json!({"name": "test category"})).await.unwrap();
        let updated = categories
            .update(&id_of(&created), json!({"name": "Updated test category"}))
            .await
            .found()
            .unwrap();
        assert_eq!(updated["name"], "Updated test category");
        assert_eq!(updated["_id"], created["_id"]);
    }

    #[tokio::test]
    async fn update_validates_the_patch() {
        let (_, products) = models().await;
        let saw = products
            .create(json!({"category": "tools", "name": "saw", "price": 10.0, "inStock": 1}))
            .await
            .unwrap();
        let outcome = products.update(&id_of(&saw), json!({"price": -3.0})).await;
        assert!(matches!(outcome.error(), Some(ModelError::Validation { .. })));
    }

    #[tokio::test]
    async fn delete_returns_snapshot_and_removes() {
        let (categories, _) = models().await;
        let created = categories.create(json!({"name": "gone"})).await.unwrap();
        let id = id_of(&created);

        let deleted = categories.delete(&id).await.found().unwrap();
        assert_eq!(deleted["_id"], created["_id"]);
        assert_eq!(deleted["name"], "gone");
        assert!(categories.read_one(&id).await.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_category_names_fail_and_leave_the_first() {
        let (categories, _) = models().await;
        let first = categories.create(json!({"name": "tools"})).await.unwrap();
        let err = categories
            .create(json!({"name": "tools", "description": "again"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Duplicate(_)));
        assert!(err.is_client_error());

        let all = categories.read().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["_id"], first["_id"]);
        assert!(all[0].get("description").is_none());
    }

    #[tokio::test]
    async fn categories_include_their_products_and_do_not_cascade() {
        let (categories, products) = models().await;
        let tools = categories.create(json!({"name": "tools"})).await.unwrap();
        categories.create(json!({"name": "garden"})).await.unwrap();
        let saw = products
            .create(json!({"category": "tools", "name": "saw", "price": 10.0, "inStock": 4}))
            .await
            .unwrap();
        products
            .create(json!({"category": "nowhere", "name": "orphan", "price": 0.0, "inStock": 0}))
            .await
            .unwrap();

        let read = categories.read_one(&id_of(&tools)).await.found().unwrap();
        let related = read["products"].as_array().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0]["_id"], saw["_id"]);

        let all = categories.read().await.unwrap();
        assert_eq!(all[1]["products"], json!([]));

        categories.delete(&id_of(&tools)).await.found().unwrap();
        assert!(products.read_one(&id_of(&saw)).await.found().is_some());
        assert_eq!(products.read().await.unwrap().len(), 2);
    }
}
