//! API error responses
//!
//! Every failure leaves the service as `{"status": <code>, "message": <...>}`.
//! Client-caused failures carry their message; infrastructure failures are
//! logged here and masked behind one generic message so no internal detail
//! ever reaches a caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::DomainError;

/// The one message clients get for any server-side failure.
pub const SERVER_ERROR_MESSAGE: &str = "Oops something went wrong";

/// Error body shape shared by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status: u16,
    pub message: String,
}

/// API error with its HTTP status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                status: status.as_u16(),
                message: message.into(),
            },
        }
    }

    /// Invalid request (missing parameter or validation failure).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// No matching record or no such route.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Server-side failure; always the generic message.
    pub fn server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::InvalidInput { message }
            | DomainError::Validation { message }
            | DomainError::Conflict { message } => Self::bad_request(message),
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Storage { .. } | DomainError::Internal { .. } => {
                error!(error = %err, "request failed");
                Self::server_error()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.body.status, self.body.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_shape() {
        let err = ApiError::not_found("No user found");
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(json, serde_json::json!({"status": 404, "message": "No user found"}));
    }

    #[test]
    fn test_input_and_validation_errors_are_400() {
        let err: ApiError = DomainError::invalid_input("No username passed").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.message, "No username passed");

        let err: ApiError = DomainError::validation("Unknown field 'foo'").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = DomainError::conflict("Username 'dup' already exists").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_is_404() {
        let err: ApiError = DomainError::not_found("No user found").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.message, "No user found");
    }

    #[test]
    fn test_infrastructure_errors_are_masked() {
        let err: ApiError = DomainError::storage("db at 10.0.0.3 unreachable").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.message, SERVER_ERROR_MESSAGE);

        let err: ApiError = DomainError::internal("index out of sync").into();
        assert_eq!(err.body.message, SERVER_ERROR_MESSAGE);
    }
}
