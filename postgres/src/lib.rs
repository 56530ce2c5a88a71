//! `PostgreSQL` document store for the RSVP platform.
//!
//! Every collection lives in one `documents` table:
//!
//! ```sql
//! CREATE TABLE documents (
//!     collection TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     version BIGINT NOT NULL DEFAULT 1,
//!     data JSONB NOT NULL,
//!     PRIMARY KEY (collection, id)
//! );
//! ```
//!
//! Unique fields (organization `slug`, registration `qrHash`) are partial
//! unique expression indexes, so uniqueness holds under concurrent inserts.
//! Conditional updates are a single `UPDATE … WHERE … RETURNING`, which makes
//! the precondition check and the write one atomic step.
//!
//! # Example
//!
//! ```no_run
//! use rsvp_postgres::PostgresDocumentStore;
//!
//! # async fn example() -> Result<(), rsvp_core::StoreError> {
//! let store = PostgresDocumentStore::connect("postgres://localhost/rsvp", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use rsvp_core::store::{
    BoxFuture, Collection, Document, DocumentStore, Patch, Preconditions, Query, StoreError,
};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

type DocumentRow = (String, i64, Json<Value>);

const SELECT_COLUMNS: &str = "SELECT id, version, data FROM documents";

/// PostgreSQL-backed [`DocumentStore`].
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a store using an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table and its indexes if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE collection = $1 AND id = $2"
        ))
        .bind(collection.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(into_document).transpose()
    }

    async fn run_query(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<DocumentRow> = select_query(collection, query)?
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;
        rows.into_iter().map(into_document).collect()
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> Result<Document, StoreError> {
        let row: DocumentRow = sqlx::query_as(
            r"
            INSERT INTO documents (collection, id, version, data)
            VALUES ($1, $2, 1, $3)
            RETURNING id, version, data
            ",
        )
        .bind(collection.name)
        .bind(&id)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(collection, e))?;

        into_document(row)
    }

    async fn conditional_update(
        &self,
        collection: Collection,
        id: String,
        patch: Patch,
        preconditions: Preconditions,
    ) -> Result<Document, StoreError> {
        let mut sql: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "UPDATE documents SET version = version + 1, updated_at = now(), data = data || ",
        );
        sql.push_bind(Json(patch))
            .push(" WHERE collection = ")
            .push_bind(collection.name)
            .push(" AND id = ")
            .push_bind(id.clone());

        if let Some(version) = preconditions.version {
            let version = i64::try_from(version)
                .map_err(|_| StoreError::Database(format!("version {version} out of range")))?;
            sql.push(" AND version = ").push_bind(version);
        }
        for (field, allowed) in &preconditions.fields {
            if allowed.is_empty() {
                sql.push(" AND FALSE");
                continue;
            }
            sql.push(" AND data -> ").push(name_literal(field)?).push(" IN (");
            let mut values = sql.separated(", ");
            for value in allowed {
                values.push_bind(Json(value.clone()));
            }
            values.push_unseparated(")");
        }
        sql.push(" RETURNING id, version, data");

        let updated: Option<DocumentRow> = sql
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| insert_error(collection, e))?;

        if let Some(row) = updated {
            return into_document(row);
        }

        // Nothing matched: either the document is missing or a condition failed
        match self.fetch(collection, &id).await? {
            None => Err(StoreError::NotFound {
                entity: collection.entity,
                id,
            }),
            Some(current) => {
                metrics::counter!(
                    "rsvp_store_precondition_failures_total",
                    "collection" => collection.name
                )
                .increment(1);
                tracing::debug!(
                    collection = collection.name,
                    version = current.version,
                    "Update precondition failed"
                );
                Err(StoreError::PreconditionFailed {
                    current: Box::new(current),
                })
            }
        }
    }
}

impl std::fmt::Debug for PostgresDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDocumentStore").finish_non_exhaustive()
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn get(
        &self,
        collection: Collection,
        id: String,
    ) -> BoxFuture<'_, Result<Option<Document>, StoreError>> {
        Box::pin(async move { self.fetch(collection, &id).await })
    }

    fn query(
        &self,
        collection: Collection,
        query: Query,
    ) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        Box::pin(async move { self.run_query(collection, &query).await })
    }

    fn create(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        Box::pin(async move { self.insert(collection, id, data).await })
    }

    fn update(
        &self,
        collection: Collection,
        id: String,
        patch: Patch,
        preconditions: Preconditions,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        Box::pin(async move {
            self.conditional_update(collection, id, patch, preconditions)
                .await
        })
    }

    fn delete(&self, collection: Collection, id: String) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move { self.remove(collection, &id).await })
    }
}

/// Build the `SELECT` for `query`.
///
/// The collection is inlined and string filters compare as text, matching the
/// partial `data ->> field` indexes of the migrations.
fn select_query(
    collection: Collection,
    query: &Query,
) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut sql: QueryBuilder<'static, Postgres> = QueryBuilder::new(SELECT_COLUMNS);
    sql.push(" WHERE collection = ").push(name_literal(collection.name)?);

    for (field, value) in &query.filters {
        let field = name_literal(field)?;
        if let Value::String(text) = value {
            sql.push(format!(" AND data ->> {field} = "))
                .push_bind(text.clone())
                .push(format!(" AND jsonb_typeof(data -> {field}) = 'string'"));
        } else {
            sql.push(format!(" AND data -> {field} = "))
                .push_bind(Json(value.clone()));
        }
    }

    match &query.order_by {
        Some(order) => {
            let key = format!("data -> {}", name_literal(order)?);
            if let Some((after, after_id)) = &query.start_after {
                sql.push(format!(" AND ({key} > "))
                    .push_bind(Json(after.clone()))
                    .push(format!(" OR ({key} = "))
                    .push_bind(Json(after.clone()))
                    .push(" AND id COLLATE \"C\" > ")
                    .push_bind(after_id.clone())
                    .push("))");
            }
            sql.push(format!(" ORDER BY {key}, id COLLATE \"C\""));
        }
        None => {
            if let Some((_, after_id)) = &query.start_after {
                sql.push(" AND id COLLATE \"C\" > ").push_bind(after_id.clone());
            }
            sql.push(" ORDER BY id COLLATE \"C\"");
        }
    }

    if let Some(limit) = query.limit {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sql.push(" LIMIT ").push_bind(limit);
    }
    Ok(sql)
}

fn into_document((id, version, Json(data)): DocumentRow) -> Result<Document, StoreError> {
    let version = u64::try_from(version)
        .map_err(|_| StoreError::Serialization(format!("document {id}: negative version")))?;
    Ok(Document { id, version, data })
}

/// A collection or top-level field name as a SQL string literal.
///
/// Names come from code, never from requests; anything outside
/// `[A-Za-z0-9_]` is refused rather than escaped.
fn name_literal(name: &str) -> Result<String, StoreError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::Database(format!("invalid name {name:?}")));
    }
    Ok(format!("'{name}'"))
}

/// Name of the unique index backing `field` in `collection`.
fn unique_index_name(collection: Collection, field: &str) -> String {
    format!(
        "documents_{}_{}_key",
        collection.name,
        field.to_ascii_lowercase()
    )
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Map unique violations to [`StoreError::Duplicate`] naming the field.
fn insert_error(collection: Collection, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            if let Some(field) = duplicate_field(collection, db.constraint().unwrap_or_default()) {
                return StoreError::Duplicate {
                    collection: collection.name,
                    field: field.to_string(),
                };
            }
        }
    }
    database_error(e)
}

fn duplicate_field(collection: Collection, constraint: &str) -> Option<&'static str> {
    if constraint == "documents_pkey" {
        return Some("id");
    }
    collection
        .unique_fields
        .iter()
        .copied()
        .find(|field| unique_index_name(collection, field) == constraint)
}
