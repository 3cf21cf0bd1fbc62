//! Handlers for the settings endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::{ApiState, error::ApiError};
use crate::{models::ThresholdUpdate, persistence::traits::KeyValueStore};

/// Returns the current settings in the `{status, settings}` envelope.
pub async fn get_settings<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.settings.current().await;
    Ok((StatusCode::OK, Json(json!({ "status": "success", "settings": settings }))))
}

/// Merges a partial update onto the settings and persists it.
///
/// The actor is the `modifiedBy` field of the payload when present.
pub async fn update_settings<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Json(update): Json<ThresholdUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = update.modified_by.clone().unwrap_or_else(|| "operator".to_string());
    let settings = state.settings.save(&update, &actor).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Settings updated successfully",
            "settings": settings,
        })),
    ))
}

/// Resets the settings to the compiled-in defaults.
pub async fn reset_settings<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.settings.reset_to_defaults().await;
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Settings reset to defaults",
            "settings": settings,
        })),
    ))
}
