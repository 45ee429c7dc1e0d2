//! ModelRegistry for mapping resource tokens to their CRUD adapters.

use crate::domain::model::{CategorySchema, CrudModel, Model, ProductSchema};
use crate::storage::{DocumentStore, StoreError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// The closed set of resources served under `/api/v1/{model}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Categories,
    Products,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Categories, Resource::Products];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Categories => "categories",
            Resource::Products => "products",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Model '{0}' is not registered")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "categories" => Ok(Resource::Categories),
            "products" => Ok(Resource::Products),
            other => Err(UnknownResource(other.to_string())),
        }
    }
}

/// Fixed, process-lifetime mapping from resource to adapter.
pub struct ModelRegistry {
    categories: Model<CategorySchema>,
    products: Model<ProductSchema>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            categories: Model::new(CategorySchema, store.clone()),
            products: Model::new(ProductSchema, store),
        }
    }

    pub fn get(&self, resource: Resource) -> &dyn CrudModel {
        match resource {
            Resource::Categories => &self.categories,
            Resource::Products => &self.products,
        }
    }

    /// Resolves a path token. Unknown tokens are an error, never a default.
    pub fn resolve(&self, token: &str) -> Result<&dyn CrudModel, UnknownResource> {
        token.parse::<Resource>().map(|r| self.get(r))
    }

    /// Returns all registered resource tokens.
    pub fn list_models(&self) -> Vec<&'static str> {
        Resource::ALL.iter().map(Resource::as_str).collect()
    }

    /// Creates every registered collection in the store (idempotent).
    pub async fn ensure_collections(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        for resource in Resource::ALL {
            let spec = self.get(resource).collection();
            store.ensure_collection(&spec).await?;
            tracing::debug!(%resource, collection = spec.name, "collection ready");
        }
        Ok(())
    }
}
