//! Handlers for alert-related endpoints: status, history, test alerts and
//! manual alert checks.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiState, error::ApiError};
use crate::{alerting::KindCooldownStatus, persistence::traits::KeyValueStore};

/// The request body for a manual test alert.
#[derive(Debug, Default, Deserialize)]
pub struct TestAlertRequest {
    /// Optional custom message body.
    #[serde(default)]
    pub message: Option<String>,
}

/// Query parameters for the alert history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Maximum number of records to return, most recent last.
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Represents the response from the `/alerts/status` endpoint.
#[derive(Debug, Serialize)]
pub struct AlertStatusResponse {
    /// Whether the Telegram transport is configured.
    pub telegram_enabled: bool,
    /// Whether the bot token resolved to a live bot.
    pub bot_configured: bool,
    /// The bot username, when live.
    pub bot_username: Option<String>,
    /// Recipients currently participating in fan-out.
    pub active_recipients: usize,
    /// Successful per-channel deliveries this session.
    pub total_alerts_sent: u64,
    /// When the most recent alert went out.
    pub last_alert: Option<DateTime<Utc>>,
    /// The configured critical TDS threshold.
    pub tds_threshold: f64,
    /// The configured temperature threshold.
    pub temp_threshold: f64,
    /// The configured cooldown in minutes.
    pub cooldown_minutes: i64,
    /// Per-kind cooldown timers.
    pub cooldowns: Vec<KindCooldownStatus>,
}

/// Retrieves comprehensive alert system status.
pub async fn alert_status<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.settings.current().await;
    let bot_username = state.engine.dispatcher().bot_username().await;
    let active_recipients = state.registry.list_active().await?.len();
    let cooldowns = state.engine.cooldown_status(&config).await?;
    let last_alert = state.engine.history(1).await?.last().map(|record| record.created_at);

    let response = AlertStatusResponse {
        telegram_enabled: state.engine.dispatcher().telegram_configured(),
        bot_configured: bot_username.is_some(),
        bot_username,
        active_recipients,
        total_alerts_sent: state.engine.total_sent(),
        last_alert,
        tds_threshold: config.tds_threshold,
        temp_threshold: config.temp_threshold,
        cooldown_minutes: config.cooldown_minutes,
        cooldowns,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Retrieves the bounded alert history.
pub async fn alert_history<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.engine.history(params.limit).await?;
    Ok((StatusCode::OK, Json(history)))
}

/// Sends a test alert to every active recipient, bypassing the cooldown
/// gate.
pub async fn send_test_alert<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
    Json(request): Json<TestAlertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.settings.current().await;
    let outcome = state.engine.send_test(request.message, &config).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": outcome.report.sent_successfully > 0,
            "sent_successfully": outcome.report.sent_successfully,
            "recipients_total": outcome.report.recipients_total,
            "bot_username": outcome.bot_username,
        })),
    ))
}

/// Triggers one alert engine evaluation against the latest reading.
///
/// When no reading has been ingested yet, one is fetched from the feed so
/// the endpoint also works for cron-style callers hitting a fresh daemon.
pub async fn check_alerts<T: KeyValueStore + 'static>(
    State(state): State<ApiState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let reading = match state.app_metrics.latest_reading().await {
        Some(reading) => reading,
        None => {
            let snapshot = state.telemetry.fetch_snapshot().await?;
            snapshot
                .latest
                .ok_or_else(|| ApiError::ServiceUnavailable("Feed has no readings".to_string()))?
        }
    };

    let config = state.settings.current().await;
    let report = state.engine.evaluate(&reading, &config).await?;
    Ok((StatusCode::OK, Json(report)))
}
