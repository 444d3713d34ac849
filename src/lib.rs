//! User Directory API
//!
//! A small HTTP service exposing CRUD and search operations over a single
//! user resource kept in a document store:
//! - strict schema validation (explicit field allowlist, nested)
//! - distinct replace (full overwrite) and patch (shallow merge) semantics
//! - credential redaction on every output path
//! - error classification: input/validation vs not-found vs infrastructure

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use api::AppState;
use domain::UserStore;
use infrastructure::store::{InMemoryUserStore, PostgresUserStore};

/// Build the application state from configuration.
///
/// With a database URL configured, records live in PostgreSQL; otherwise
/// the service runs on the in-memory store (useful for development and
/// tests, not durable).
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn UserStore> = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections())
                .connect(url)
                .await?;

            let store = PostgresUserStore::new(pool);
            store.ensure_schema().await?;
            info!("Connected to database");
            Arc::new(store)
        }
        None => {
            info!("No database configured, using in-memory store");
            Arc::new(InMemoryUserStore::new())
        }
    };

    Ok(AppState::new(store))
}
