//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifecycle::{EngineError, InventoryError};

/// API-level error type that maps to HTTP responses.
///
/// Every failure body carries `{"success": false, "error": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Lifecycle engine error.
    Engine(EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Engine(err) => engine_error_to_response(err),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidState { .. } => StatusCode::CONFLICT,
        EngineError::InsufficientStock { .. } => StatusCode::CONFLICT,
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::InvalidOwner(_) | EngineError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
        EngineError::Inventory(InventoryError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
        EngineError::Inventory(_) | EngineError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}
