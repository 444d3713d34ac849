use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::health;
use super::state::AppState;
use super::types::ApiError;
use super::users;
use crate::domain::UserStore;

/// Create the application router.
///
/// CORS is open for all requests, as the service has no browser-facing
/// auth; unknown routes fall through to a JSON 404.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/users", post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user)
                .delete(users::delete_user)
                .put(users::replace_user)
                .patch(users::patch_user),
        )
        .route("/search/users", post(users::search_users))
        .fallback(unknown_route)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create a router backed by the given store.
pub fn create_router_with_store(store: Arc<dyn UserStore>) -> Router {
    create_router(AppState::new(store))
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("Sorry cant find that!")
}
