//! User endpoint handlers
//!
//! Thin mapping only: pull the username path segment and the JSON body
//! out of the request, hand them to the service, and let `ApiError`
//! translate whatever comes back.

use axum::extract::{Path, State};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::Document;
use crate::infrastructure::user::MAX_SEARCH_RESULTS;

fn ok() -> Json<Value> {
    Json(json!({"OK": 1}))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Document>, ApiError> {
    debug!(username, "get user");

    let user = state.users.get_by_username(&username).await?;
    Ok(Json(user))
}

/// DELETE /users/{username}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    debug!(username, "delete user");

    state.users.delete_by_username(&username).await?;
    Ok(ok())
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(data): Json<Document>,
) -> Result<Json<Value>, ApiError> {
    debug!("create user");

    state.users.create(data).await?;
    Ok(ok())
}

/// PUT /users/{username} - full replacement, omitted fields are removed
pub async fn replace_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(data): Json<Document>,
) -> Result<Json<Value>, ApiError> {
    debug!(username, "replace user");

    state.users.replace(&username, data).await?;
    Ok(ok())
}

/// PATCH /users/{username} - merge only the supplied fields
pub async fn patch_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(patch): Json<Document>,
) -> Result<Json<Value>, ApiError> {
    debug!(username, "patch user");

    state.users.patch(&username, patch).await?;
    Ok(ok())
}

/// POST /search/users - bare array of matching records, capped
pub async fn search_users(
    State(state): State<AppState>,
    Json(query): Json<Document>,
) -> Result<Json<Vec<Document>>, ApiError> {
    debug!("search users");

    let users = state.users.search(query, MAX_SEARCH_RESULTS).await?;
    Ok(Json(users))
}
