//! In-memory user store
//!
//! The default store when no database is configured; also what the tests
//! run against. Documents live in a `BTreeMap` keyed by the assigned `_id`
//! so "first match" is stable, with a username index enforcing uniqueness.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::user::{
    apply_patch, ensure_limit, ensure_query, expand_dotted, matches, Document, UserStore,
};
use crate::domain::DomainError;

/// In-memory implementation of `UserStore`.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: BTreeMap<u64, Document>,
    username_index: HashMap<String, u64>,
    next_id: u64,
}

impl InMemoryUserStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Inner {
    fn first_match(&self, query: &Document) -> Option<u64> {
        self.docs
            .iter()
            .find(|(_, doc)| matches(doc, query))
            .map(|(id, _)| *id)
    }

    /// Check the unique username index, ignoring `exclude` (the document
    /// being rewritten).
    fn check_username_free(
        &self,
        username: &str,
        exclude: Option<u64>,
    ) -> Result<(), DomainError> {
        match self.username_index.get(username) {
            Some(owner) if Some(*owner) != exclude => {
                debug!(username, "username already taken");
                Err(DomainError::conflict(format!(
                    "Username '{username}' already exists"
                )))
            }
            _ => Ok(()),
        }
    }
}

fn username_of(doc: &Document) -> Result<String, DomainError> {
    doc.get("username")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| DomainError::validation("Field 'username' is required"))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, doc: Document) -> Result<(), DomainError> {
        let username = username_of(&doc)?;
        let mut inner = self.inner.write().await;

        inner.check_username_free(&username, None)?;

        let id = inner.next_id;
        inner.next_id += 1;

        let mut stored = expand_dotted(&doc);
        stored.insert("_id".to_string(), json!(id));
        stored.insert("_rev".to_string(), json!(1));

        inner.username_index.insert(username, id);
        inner.docs.insert(id, stored);
        Ok(())
    }

    async fn find_one(&self, query: &Document) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;
        let inner = self.inner.read().await;
        Ok(inner
            .first_match(query)
            .and_then(|id| inner.docs.get(&id).cloned()))
    }

    async fn find_many(
        &self,
        query: &Document,
        limit: usize,
    ) -> Result<Vec<Document>, DomainError> {
        ensure_query(query)?;
        ensure_limit(limit)?;
        let inner = self.inner.read().await;
        Ok(inner
            .docs
            .values()
            .filter(|doc| matches(doc, query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_one(&self, query: &Document) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;
        let mut inner = self.inner.write().await;

        let Some(id) = inner.first_match(query) else {
            return Ok(None);
        };

        let doc = inner.docs.remove(&id);
        if let Some(doc) = &doc {
            if let Ok(username) = username_of(doc) {
                inner.username_index.remove(&username);
            }
        }
        Ok(doc)
    }

    async fn replace_one(
        &self,
        query: &Document,
        doc: Document,
    ) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;
        let new_username = username_of(&doc)?;
        let mut inner = self.inner.write().await;

        let Some(id) = inner.first_match(query) else {
            return Ok(None);
        };

        inner.check_username_free(&new_username, Some(id))?;

        let previous = inner.docs.get(&id).cloned();
        let rev = previous
            .as_ref()
            .and_then(|doc| doc.get("_rev"))
            .and_then(|rev| rev.as_i64())
            .unwrap_or(0);

        let mut replacement = expand_dotted(&doc);
        replacement.insert("_id".to_string(), json!(id));
        replacement.insert("_rev".to_string(), json!(rev + 1));

        if let Some(old) = &previous {
            if let Ok(old_username) = username_of(old) {
                inner.username_index.remove(&old_username);
            }
        }
        inner.username_index.insert(new_username, id);
        inner.docs.insert(id, replacement);

        Ok(previous)
    }

    async fn patch_one(
        &self,
        query: &Document,
        patch: Document,
    ) -> Result<Option<Document>, DomainError> {
        ensure_query(query)?;
        let mut inner = self.inner.write().await;

        let Some(id) = inner.first_match(query) else {
            return Ok(None);
        };

        let previous = match inner.docs.get(&id) {
            Some(doc) => doc.clone(),
            None => return Ok(None),
        };

        let mut patched = previous.clone();
        apply_patch(&mut patched, &patch);

        // a patch may rename the user; the index must follow
        let old_username = username_of(&previous)?;
        let new_username = username_of(&patched)?;
        if new_username != old_username {
            inner.check_username_free(&new_username, Some(id))?;
            inner.username_index.remove(&old_username);
            inner.username_index.insert(new_username, id);
        }

        let rev = previous
            .get("_rev")
            .and_then(|rev| rev.as_i64())
            .unwrap_or(0);
        patched.insert("_rev".to_string(), json!(rev + 1));

        inner.docs.insert(id, patched);
        Ok(Some(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().expect("test doc must be an object").clone()
    }

    fn alice() -> Document {
        doc(json!({
            "username": "alice",
            "gender": "female",
            "name": {"first": "alison", "last": "reid"},
            "email": "alice@example.com"
        }))
    }

    #[tokio::test]
    async fn test_create_and_find_one() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        let found = store
            .find_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("email"), Some(&json!("alice@example.com")));
        assert!(found.contains_key("_id"));
        assert_eq!(found.get("_rev"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_create_duplicate_username_conflicts() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        let result = store.create(alice()).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = InMemoryUserStore::new();
        let empty = Document::new();

        assert!(matches!(
            store.find_one(&empty).await,
            Err(DomainError::InvalidInput { .. })
        ));
        assert!(matches!(
            store.delete_one(&empty).await,
            Err(DomainError::InvalidInput { .. })
        ));
        assert!(matches!(
            store.patch_one(&empty, alice()).await,
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_many_respects_limit() {
        let store = InMemoryUserStore::new();
        for i in 0..5 {
            store
                .create(doc(json!({"username": format!("user{i}"), "gender": "female"})))
                .await
                .unwrap();
        }

        let found = store
            .find_many(&doc(json!({"gender": "female"})), 3)
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        assert!(matches!(
            store.find_many(&doc(json!({"gender": "female"})), 0).await,
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_many_no_match_is_empty() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        let found = store
            .find_many(&doc(json!({"gender": "male"})), 30)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_delete_one_frees_username() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        let deleted = store
            .delete_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap();
        assert!(deleted.is_some());
        assert!(store.is_empty().await);

        // username usable again
        store.create(alice()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_one_miss_returns_none() {
        let store = InMemoryUserStore::new();
        let deleted = store
            .delete_one(&doc(json!({"username": "ghost"})))
            .await
            .unwrap();
        assert!(deleted.is_none());
    }

    #[tokio::test]
    async fn test_replace_removes_omitted_fields() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        let replaced = store
            .replace_one(
                &doc(json!({"username": "alice"})),
                doc(json!({"username": "alice", "phone": "031-541-9181"})),
            )
            .await
            .unwrap();
        let previous = replaced.expect("record existed");

        let found = store
            .find_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("phone"), Some(&json!("031-541-9181")));
        assert!(!found.contains_key("gender"));
        assert!(!found.contains_key("email"));
        // identity preserved, revision bumped
        assert_eq!(found.get("_id"), previous.get("_id"));
        assert_eq!(found.get("_rev"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_replace_miss_returns_none() {
        let store = InMemoryUserStore::new();
        let result = store
            .replace_one(&doc(json!({"username": "ghost"})), alice())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_replace_cannot_steal_username() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();
        store
            .create(doc(json!({"username": "bob"})))
            .await
            .unwrap();

        let result = store
            .replace_one(
                &doc(json!({"username": "bob"})),
                doc(json!({"username": "alice"})),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_patch_merges_shallow() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        store
            .patch_one(
                &doc(json!({"username": "alice"})),
                doc(json!({"name.last": "smith"})),
            )
            .await
            .unwrap()
            .unwrap();

        let found = store
            .find_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(get(&found, "name.last"), json!("smith"));
        assert_eq!(get(&found, "name.first"), json!("alison"));
        assert_eq!(found.get("email"), Some(&json!("alice@example.com")));
        assert_eq!(found.get("_rev"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_patch_whole_subobject_replaces_it() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        store
            .patch_one(
                &doc(json!({"username": "alice"})),
                doc(json!({"name": {"last": "smith"}})),
            )
            .await
            .unwrap();

        let found = store
            .find_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(get(&found, "name.last"), json!("smith"));
        assert_eq!(found["name"].as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_patch_rename_updates_index() {
        let store = InMemoryUserStore::new();
        store.create(alice()).await.unwrap();

        store
            .patch_one(
                &doc(json!({"username": "alice"})),
                doc(json!({"username": "alicia"})),
            )
            .await
            .unwrap();

        assert!(store
            .find_one(&doc(json!({"username": "alice"})))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_one(&doc(json!({"username": "alicia"})))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_patch_miss_returns_none() {
        let store = InMemoryUserStore::new();
        let result = store
            .patch_one(
                &doc(json!({"username": "ghost"})),
                doc(json!({"gender": "male"})),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    fn get(document: &Document, path: &str) -> serde_json::Value {
        crate::domain::user::get_path(document, path)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}
