//! Error types for the REST API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// No playable scenario matches the requested filters
    NoScenarioAvailable,
    /// Scenario id does not exist
    ScenarioNotFound(i64),
    /// Player choice was neither "value" nor "trap"
    InvalidChoice(String),
    /// Invalid parameter in request
    InvalidParameter(String),
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NoScenarioAvailable => write!(f, "No scenarios available"),
            ApiError::ScenarioNotFound(id) => write!(f, "Scenario not found: {}", id),
            ApiError::InvalidChoice(choice) => write!(f, "Invalid choice: {}", choice),
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NoScenarioAvailable => (
                StatusCode::NOT_FOUND,
                "NoScenarioAvailable",
                "No playable scenario matches the requested filters".to_string(),
            ),
            ApiError::ScenarioNotFound(id) => (
                StatusCode::NOT_FOUND,
                "ScenarioNotFound",
                format!("Scenario '{}' not found", id),
            ),
            ApiError::InvalidChoice(choice) => (
                StatusCode::BAD_REQUEST,
                "InvalidChoice",
                format!("Choice must be 'value' or 'trap', got '{}'", choice),
            ),
            ApiError::InvalidParameter(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidParameter", msg.clone())
            }
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoPlayableScenario => ApiError::NoScenarioAvailable,
            StoreError::ScenarioNotFound(id) => ApiError::ScenarioNotFound(id),
            StoreError::InsufficientHistory(e) => ApiError::InternalError(e.to_string()),
            StoreError::Sqlite(e) => ApiError::InternalError(e.to_string()),
        }
    }
}
