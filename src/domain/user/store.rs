//! User store trait
//!
//! The document store behind the service, abstracted to its six operations.
//! Implementations classify their failures into the `DomainError` taxonomy:
//! constraint violations (the unique username index) surface as `Conflict`,
//! anything infrastructural as `Storage`.

use std::fmt::Debug;

use async_trait::async_trait;

use super::document::Document;
use crate::domain::DomainError;

/// Abstract query/create/update/patch/delete interface over user documents.
///
/// Queries are exact-match documents whose keys may be dotted paths. Every
/// query-taking operation requires a non-empty query; `ensure_query` is the
/// shared guard.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    /// Insert a new document. The store assigns `_id` and `_rev`.
    async fn create(&self, doc: Document) -> Result<(), DomainError>;

    /// Find the first document matching the query.
    async fn find_one(&self, query: &Document) -> Result<Option<Document>, DomainError>;

    /// Find up to `limit` documents matching the query. `limit` must be
    /// positive.
    async fn find_many(&self, query: &Document, limit: usize)
        -> Result<Vec<Document>, DomainError>;

    /// Delete the first matching document, returning it, or `None` when
    /// nothing matched.
    async fn delete_one(&self, query: &Document) -> Result<Option<Document>, DomainError>;

    /// Replace the first matching document in full.
    ///
    /// The store's native update merges fields, so replacement is find-then-
    /// overwrite keyed by the durable `_id`: fields omitted from `doc` are
    /// actually removed, not left stale. Returns the previous document, or
    /// `None` when nothing matched (not an error). The find and the
    /// overwrite are not atomic; a concurrent delete in between can
    /// resurrect the record.
    async fn replace_one(
        &self,
        query: &Document,
        doc: Document,
    ) -> Result<Option<Document>, DomainError>;

    /// Merge only the supplied fields into the first matching document.
    ///
    /// The merge is shallow per supplied key: a dotted path updates one
    /// leaf, a whole sub-object value replaces that sub-object entirely.
    /// Returns the pre-patch document, or `None` when nothing matched.
    async fn patch_one(
        &self,
        query: &Document,
        patch: Document,
    ) -> Result<Option<Document>, DomainError>;
}

/// Reject empty queries before they reach the store.
pub fn ensure_query(query: &Document) -> Result<(), DomainError> {
    if query.is_empty() {
        return Err(DomainError::invalid_input("Empty query"));
    }
    Ok(())
}

/// Reject a non-positive find limit.
pub fn ensure_limit(limit: usize) -> Result<(), DomainError> {
    if limit == 0 {
        return Err(DomainError::invalid_input("Limit must be positive"));
    }
    Ok(())
}
