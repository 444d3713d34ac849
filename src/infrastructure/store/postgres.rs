//! PostgreSQL user store
//!
//! Documents are kept as JSONB in a single `users` table with a unique
//! username column. Query entries become `doc #> path = value` equality
//! predicates, one per entry, so the semantics match the in-memory store
//! exactly. All sqlx failures go through one classifier: unique-index
//! violations come back as `Conflict` (client-facing), everything else as
//! `Storage`.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use tracing::{debug, error};

use crate::domain::user::{
    apply_patch, ensure_limit, ensure_query, expand_dotted, Document, INTERNAL_FIELDS,
};
use crate::domain::{DomainError, UserStore};

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of `UserStore`.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                doc JSONB NOT NULL,
                rev BIGINT NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| classify("Failed to ensure schema", e))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create(&self, doc: Document) -> Result<(), DomainError> {
        let (username, stored) = to_stored(&doc)?;

        sqlx::query("INSERT INTO users (username, doc) VALUES ($1, $2)")
            .bind(&username)
            .bind(&stored)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to create user", e))?;

        Ok(())
    }

    async fn find_one(&self, query: &Document) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;

        let sql = format!(
            "SELECT id, doc, rev FROM users WHERE {} ORDER BY id LIMIT 1",
            predicate_sql(query, 1),
        );
        let mut stmt = sqlx::query(&sql);
        for (path, value) in query {
            stmt = stmt.bind(path_segments(path)).bind(value);
        }

        let row = stmt
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find user", e))?;

        row.map(|row| row_to_doc(&row)).transpose()
    }

    async fn find_many(
        &self,
        query: &Document,
        limit: usize,
    ) -> Result<Vec<Document>, DomainError> {
        ensure_query(query)?;
        ensure_limit(limit)?;

        let limit_param = query.len() * 2 + 1;
        let sql = format!(
            "SELECT id, doc, rev FROM users WHERE {} ORDER BY id LIMIT ${limit_param}",
            predicate_sql(query, 1),
        );
        let mut stmt = sqlx::query(&sql);
        for (path, value) in query {
            stmt = stmt.bind(path_segments(path)).bind(value);
        }

        let rows = stmt
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify("Failed to find users", e))?;

        rows.iter().map(row_to_doc).collect()
    }

    async fn delete_one(&self, query: &Document) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;

        let sql = format!(
            r#"
            DELETE FROM users
            WHERE id = (SELECT id FROM users WHERE {} ORDER BY id LIMIT 1)
            RETURNING id, doc, rev
            "#,
            predicate_sql(query, 1),
        );
        let mut stmt = sqlx::query(&sql);
        for (path, value) in query {
            stmt = stmt.bind(path_segments(path)).bind(value);
        }

        let row = stmt
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to delete user", e))?;

        row.map(|row| row_to_doc(&row)).transpose()
    }

    async fn replace_one(
        &self,
        query: &Document,
        doc: Document,
    ) -> Result<Option<Document>, DomainError> {
        // find-then-overwrite keyed by id, so omitted fields are removed
        let Some(previous) = self.find_one(query).await? else {
            return Ok(None);
        };
        let id = doc_id(&previous)?;
        let (username, stored) = to_stored(&doc)?;

        sqlx::query("UPDATE users SET username = $1, doc = $2, rev = rev + 1 WHERE id = $3")
            .bind(&username)
            .bind(&stored)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to replace user", e))?;

        Ok(Some(previous))
    }

    async fn patch_one(
        &self,
        query: &Document,
        patch: Document,
    ) -> Result<Option<Document>, DomainError> {
        let Some(previous) = self.find_one(query).await? else {
            return Ok(None);
        };
        let id = doc_id(&previous)?;

        let mut patched = previous.clone();
        apply_patch(&mut patched, &patch);
        let (username, stored) = to_stored(&patched)?;

        sqlx::query("UPDATE users SET username = $1, doc = $2, rev = rev + 1 WHERE id = $3")
            .bind(&username)
            .bind(&stored)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to patch user", e))?;

        Ok(Some(previous))
    }
}

/// One `doc #> path = value` equality predicate per query entry.
///
/// This mirrors the in-memory store exactly: a dotted path compares the
/// addressed leaf, and a whole-object value must equal the stored
/// sub-object in full. JSONB `@>` containment is deliberately not used
/// here, as it would also accept partial sub-object matches.
fn predicate_sql(query: &Document, first_param: usize) -> String {
    (0..query.len())
        .map(|i| {
            let path_param = first_param + i * 2;
            let value_param = first_param + i * 2 + 1;
            format!("doc #> ${path_param} = ${value_param}")
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Dotted path to the text[] form the `#>` operator takes.
fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Split a document into its username and the JSONB payload to store.
///
/// Internal fields are kept in the table columns, not in the payload.
fn to_stored(doc: &Document) -> Result<(String, Value), DomainError> {
    let username = doc
        .get("username")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| DomainError::validation("Field 'username' is required"))?;

    let mut payload = expand_dotted(doc);
    for field in INTERNAL_FIELDS {
        payload.remove(*field);
    }

    Ok((username, Value::Object(payload)))
}

fn row_to_doc(row: &sqlx::postgres::PgRow) -> Result<Document, DomainError> {
    let id: i64 = row.get("id");
    let rev: i64 = row.get("rev");
    let value: Value = row.get("doc");

    let mut doc = value
        .as_object()
        .cloned()
        .ok_or_else(|| DomainError::internal("Stored document is not a JSON object"))?;
    doc.insert("_id".to_string(), json!(id));
    doc.insert("_rev".to_string(), json!(rev));

    Ok(doc)
}

fn doc_id(doc: &Document) -> Result<i64, DomainError> {
    doc.get("_id")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| DomainError::internal("Stored document has no identifier"))
}

/// Classify a sqlx failure: constraint violations are the client's problem,
/// everything else is infrastructure and only ever logged here.
fn classify(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            debug!(error = %db_err, "{context}: unique index violation");
            return DomainError::conflict("Username already exists");
        }
    }

    error!(error = %err, "{context}");
    DomainError::storage(format!("{context}: {err}"))
}
