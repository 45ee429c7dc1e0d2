//! Document store implementation using PostgreSQL.
//!
//! Each collection is a table holding one JSONB document per row. `seq` keeps
//! insertion order; unique fields are enforced by expression indexes named
//! `<collection>_<field>_key`.

use crate::storage::{
    CollectionSpec, Document, DocumentStore, Filter, JsonMap, ObjectId, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

const UNIQUE_VIOLATION: &str = "23505";

/// A persistent document store that uses a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

pub fn validate_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn table(collection: &str) -> Result<&str, StoreError> {
    if validate_ident(collection) {
        Ok(collection)
    } else {
        Err(StoreError::UnknownCollection(collection.to_string()))
    }
}

fn row_to_document(collection: &str, row: &PgRow) -> Result<Document, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        collection: collection.to_string(),
        reason,
    };

    let id: String = row.try_get("id")?;
    let doc: JsonValue = row.try_get("doc")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let id = id.parse::<ObjectId>().map_err(|e| corrupt(e.to_string()))?;
    let JsonValue::Object(body) = doc else {
        return Err(corrupt(format!("document {} is not a JSON object", id)));
    };

    Ok(Document {
        id,
        body,
        created_at,
        updated_at,
    })
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Maps a unique-index violation back to the field it guards.
    fn map_write_error(&self, collection: &str, body: &JsonMap, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let prefix = format!("{}_", collection);
                let field = db_err
                    .constraint()
                    .and_then(|c| c.strip_prefix(&prefix))
                    .and_then(|c| c.strip_suffix("_key"))
                    .unwrap_or("_id")
                    .to_string();
                let value = body.get(&field).cloned().unwrap_or(JsonValue::Null);
                return StoreError::Duplicate {
                    collection: collection.to_string(),
                    field,
                    value,
                };
            }
        }
        StoreError::Backend(err)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let table = table(spec.name)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await?;

        for field in spec.unique {
            if !validate_ident(field) {
                return Err(StoreError::Corrupt {
                    collection: table.to_string(),
                    reason: format!("invalid unique field name '{}'", field),
                });
            }
            sqlx::query(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{field}_key ON {table} ((doc->>'{field}'))"
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn create(&self, collection: &str, body: JsonMap) -> Result<Document, StoreError> {
        let table = table(collection)?;
        let id = ObjectId::new();
        let now = Utc::now();

        let row = sqlx::query(&format!(
            "INSERT INTO {table} (id, doc, created_at, updated_at) VALUES ($1, $2, $3, $3)
             RETURNING id, doc, created_at, updated_at"
        ))
        .bind(id.to_hex())
        .bind(JsonValue::Object(body.clone()))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.map_write_error(collection, &body, e))?;

        row_to_document(collection, &row)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let table = table(collection)?;
        let rows = if filter.is_empty() {
            sqlx::query(&format!(
                "SELECT id, doc, created_at, updated_at FROM {table} ORDER BY seq"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT id, doc, created_at, updated_at FROM {table} WHERE doc @> $1 ORDER BY seq"
            ))
            .bind(filter.as_json())
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter()
            .map(|row| row_to_document(collection, row))
            .collect()
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let table = table(collection)?;
        let row = sqlx::query(&format!(
            "SELECT id, doc, created_at, updated_at FROM {table} WHERE id = $1"
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_document(collection, &r)).transpose()
    }

    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        patch: JsonMap,
    ) -> Result<Option<Document>, StoreError> {
        let table = table(collection)?;
        let row = sqlx::query(&format!(
            "UPDATE {table} SET doc = doc || $2, updated_at = $3 WHERE id = $1
             RETURNING id, doc, created_at, updated_at"
        ))
        .bind(id.to_hex())
        .bind(JsonValue::Object(patch.clone()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.map_write_error(collection, &patch, e))?;

        row.map(|r| row_to_document(collection, &r)).transpose()
    }

    async fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let table = table(collection)?;
        let row = sqlx::query(&format!(
            "DELETE FROM {table} WHERE id = $1 RETURNING id, doc, created_at, updated_at"
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_document(collection, &r)).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plain_identifiers_are_accepted_as_collections() {
        assert!(validate_ident("categories"));
        assert!(validate_ident("_products2"));
        assert!(!validate_ident("2products"));
        assert!(!validate_ident("products; DROP TABLE x"));
        assert!(!validate_ident(""));
        assert!(table("bad-name").is_err());
    }
}
