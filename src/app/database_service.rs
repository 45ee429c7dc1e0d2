//! The database service.
//!
//! Owns the process-wide store connection. It is opened once at startup, handed
//! to the model registry by reference, and closed explicitly at shutdown.

use crate::domain::model::ModelRegistry;
use crate::infra::config::StoreConfig;
use crate::storage::{DocumentStore, MemoryDocumentStore, PgDocumentStore, StoreError};
use std::sync::Arc;

pub struct DatabaseService {
    store: Arc<dyn DocumentStore>,
    backend: &'static str,
}

impl DatabaseService {
    /// Connects to the configured backend.
    pub async fn connect(config: &StoreConfig) -> Result<Self, anyhow::Error> {
        match config {
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let store = PgDocumentStore::connect(database_url, *max_connections).await?;
                tracing::info!(max_connections, "connected to postgres document store");
                Ok(Self {
                    store: Arc::new(store),
                    backend: "postgres",
                })
            }
            StoreConfig::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn in_memory() -> Self {
        tracing::info!("using in-memory document store");
        Self::with_store(Arc::new(MemoryDocumentStore::new()), "memory")
    }

    /// Wraps an already-open store.
    pub fn with_store(store: Arc<dyn DocumentStore>, backend: &'static str) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Builds the registry over this connection and makes sure its collections exist.
    pub async fn open_registry(&self) -> Result<ModelRegistry, StoreError> {
        let registry = ModelRegistry::new(self.store());
        registry.ensure_collections(self.store.as_ref()).await?;
        Ok(registry)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn close(&self) {
        self.store.close().await;
        tracing::info!(backend = self.backend, "document store closed");
    }
}
