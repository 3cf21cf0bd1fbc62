//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    alerting::AlertEngineError,
    models::{RecipientValidationError, ThresholdConfigError},
    persistence::error::PersistenceError,
    recipients::RegistryError,
    telemetry::FeedError,
};

/// A custom error type for the API that can be converted into an HTTP response.
pub enum ApiError {
    /// Represents an unauthorized request.
    Unauthorized,

    /// Represents a resource that could not be found.
    NotFound(String),

    /// Represents a validation error for an unprocessable entity.
    UnprocessableEntity(String),

    /// Represents a conflict, e.g., a resource that already exists.
    Conflict(String),

    /// Represents a dependency (feed, notification transport) that is not
    /// available right now.
    ServiceUnavailable(String),

    /// Represents a generic internal server error.
    InternalServerError(String),
}

/// Converts a `PersistenceError` into an `ApiError`.
///
/// This allows for the convenient use of the `?` operator in handlers
/// on functions that return `Result<_, PersistenceError>`.
impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(RecipientValidationError::DuplicatePhone(phone)) =>
                ApiError::Conflict(format!("Phone number '{}' is already registered.", phone)),
            RegistryError::Validation(e) => ApiError::UnprocessableEntity(e.to_string()),
            RegistryError::NotFound(id) =>
                ApiError::NotFound(format!("Recipient {} not found", id)),
            RegistryError::Persistence(e) => e.into(),
        }
    }
}

impl From<ThresholdConfigError> for ApiError {
    fn from(err: ThresholdConfigError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

impl From<AlertEngineError> for ApiError {
    fn from(err: AlertEngineError) -> Self {
        match err {
            AlertEngineError::Registry(e) => e.into(),
            AlertEngineError::StateRepository(e) => e.into(),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// This is the central point for mapping internal application errors to
/// user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Unauthorized =>
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::UnprocessableEntity(message) =>
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message })),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::ServiceUnavailable(message) =>
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message })),
        };

        (status, Json(body)).into_response()
    }
}
