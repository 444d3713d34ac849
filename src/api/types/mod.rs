//! API response and error types

pub mod error;
pub mod json;

pub use error::{ApiError, ApiErrorBody, SERVER_ERROR_MESSAGE};
pub use json::Json;
