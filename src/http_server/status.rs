//! Represents the `/status` endpoint handler and response structure.
//! Provides application status and metrics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ApiState, error::ApiError};
use crate::{classifier::Status, models::Reading, persistence::traits::KeyValueStore};

/// Represents the response from the `/status` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct StatusResponse {
    /// The version of the application.
    pub version: String,
    /// The channel the daemon is monitoring.
    pub channel_id: String,
    /// The uptime of the application in seconds.
    pub uptime_secs: u64,
    /// Number of feed polls that produced a reading.
    pub readings_ingested: u64,
    /// Number of feed polls that failed.
    pub poll_failures: u64,
    /// When the feed last answered; the staleness indicator.
    pub last_feed_update: Option<DateTime<Utc>>,
    /// The most recent reading.
    pub latest_reading: Option<Reading>,
    /// Live status of the latest reading.
    pub status: Option<Status>,
}

/// Retrieves application status and metrics.
pub async fn status<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let metrics = state.app_metrics.metrics.read().await;
    let response = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        channel_id: state.config.feed.channel_id.clone(),
        uptime_secs: metrics.start_time.elapsed().as_secs(),
        readings_ingested: metrics.readings_ingested,
        poll_failures: metrics.poll_failures,
        last_feed_update: metrics.last_feed_update,
        latest_reading: metrics.latest_reading,
        status: metrics.last_status,
    };
    Ok((StatusCode::OK, Json(response)))
}
