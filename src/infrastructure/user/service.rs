//! User service
//!
//! One method per use case, all following the same shape: check inputs,
//! validate the payload, call the store, map the outcome. Every record
//! leaving the service is redacted, and credential material is stripped
//! from inbound payloads before validation so clients can never set it.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::domain::user::{
    omitted_fields, redact, strip_fields, validate_query, validate_record, Document,
    ValidationMode,
};
use crate::domain::{DomainError, UserStore};

/// Hard cap on search results regardless of match count.
pub const MAX_SEARCH_RESULTS: usize = 30;

/// Business logic over the user store.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Look up a user by username and return the redacted record.
    pub async fn get_by_username(&self, username: &str) -> Result<Document, DomainError> {
        ensure_username(username)?;

        let user = self
            .store
            .find_one(&username_query(username))
            .await?
            .ok_or_else(|| DomainError::not_found("No user found"))?;

        Ok(redact(&user))
    }

    /// Delete a user by username.
    pub async fn delete_by_username(&self, username: &str) -> Result<(), DomainError> {
        ensure_username(username)?;

        self.store
            .delete_one(&username_query(username))
            .await?
            .ok_or_else(|| DomainError::not_found("No user found"))?;

        Ok(())
    }

    /// Create a new user from client data.
    pub async fn create(&self, data: Document) -> Result<(), DomainError> {
        if data.is_empty() {
            return Err(DomainError::invalid_input("No user data passed"));
        }

        let data = strip_fields(&data, &omitted_fields());
        check_record(&data, ValidationMode::Create)?;

        self.store.create(data).await
    }

    /// Replace a user's record in full; fields omitted from `data` are
    /// removed.
    pub async fn replace(&self, username: &str, data: Document) -> Result<(), DomainError> {
        ensure_username(username)?;
        if data.is_empty() {
            return Err(DomainError::invalid_input("No user data passed"));
        }

        let data = strip_fields(&data, &omitted_fields());
        check_record(&data, ValidationMode::Replace)?;

        self.store
            .replace_one(&username_query(username), data)
            .await?
            .ok_or_else(|| DomainError::not_found("No user found"))?;

        Ok(())
    }

    /// Merge the supplied fields into a user's record.
    pub async fn patch(&self, username: &str, patch: Document) -> Result<(), DomainError> {
        ensure_username(username)?;
        if patch.is_empty() {
            return Err(DomainError::invalid_input("No patch passed"));
        }

        let patch = strip_fields(&patch, &omitted_fields());
        if patch.is_empty() {
            return Err(DomainError::invalid_input(
                "Patch only has omitted properties",
            ));
        }
        check_record(&patch, ValidationMode::Patch)?;

        self.store
            .patch_one(&username_query(username), patch)
            .await?
            .ok_or_else(|| DomainError::not_found("No user found"))?;

        Ok(())
    }

    /// Find users matching the query, redacted and capped at `max_results`.
    pub async fn search(
        &self,
        query: Document,
        max_results: usize,
    ) -> Result<Vec<Document>, DomainError> {
        if query.is_empty() {
            return Err(DomainError::invalid_input("No query passed"));
        }

        let query = strip_fields(&query, &omitted_fields());
        if query.is_empty() {
            return Err(DomainError::invalid_input(
                "Query only has omitted properties",
            ));
        }

        if let Err(err) = validate_query(&query) {
            debug!(%err, "rejected search query");
            return Err(DomainError::validation(err.to_string()));
        }

        let users = self.store.find_many(&query, max_results).await?;
        Ok(users.iter().map(redact).collect())
    }
}

fn username_query(username: &str) -> Document {
    let mut query = Document::new();
    query.insert("username".to_string(), json!(username));
    query
}

fn ensure_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::invalid_input("No username passed"));
    }
    Ok(())
}

fn check_record(doc: &Document, mode: ValidationMode) -> Result<(), DomainError> {
    validate_record(doc, mode).map_err(|err| {
        debug!(%err, ?mode, "rejected user record");
        DomainError::validation(err.to_string())
    })
}
