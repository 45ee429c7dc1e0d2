pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::database_service::DatabaseService;
pub use domain::model::{CrudModel, Model, ModelError, ModelRegistry, Outcome, Resource};
pub use infra::config::{AppConfig, StoreConfig};
pub use storage::{DocumentStore, MemoryDocumentStore, ObjectId, PgDocumentStore};
