//! API layer - HTTP endpoints and request/response mapping

pub mod health;
pub mod router;
pub mod state;
pub mod types;
pub mod users;

pub use router::{create_router, create_router_with_store};
pub use state::AppState;
