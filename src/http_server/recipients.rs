//! Handlers for recipient-related endpoints in the HTTP server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use super::{ApiState, error::ApiError};
use crate::{models::RecipientSpec, persistence::traits::KeyValueStore};

fn default_active_only() -> bool {
    true
}

/// Query parameters for the recipient listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Whether to include deactivated recipients.
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

/// Retrieves recipients, active-only by default.
pub async fn get_recipients<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let recipients = if params.active_only {
        state.registry.list_active().await?
    } else {
        state.registry.list().await?
    };
    Ok((StatusCode::OK, Json(recipients)))
}

/// Registers a new recipient.
pub async fn create_recipient<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Json(spec): Json<RecipientSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = state.registry.add(spec).await?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

/// Deletes a recipient.
pub async fn delete_recipient<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Path(recipient_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.remove(recipient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activates or deactivates a recipient.
pub async fn toggle_recipient<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Path(recipient_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = state.registry.toggle_active(recipient_id).await?;
    Ok((StatusCode::OK, Json(recipient)))
}
