//! HTTP server module: the operator API.
//!
//! Read endpoints (status, settings, recipients, history) are open; write
//! endpoints are gated by bearer auth when an API key is configured.

mod alerts;
mod auth;
mod error;
mod recipients;
mod settings;
mod status;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde_json::json;

pub use alerts::{AlertStatusResponse, TestAlertRequest};
pub use error::ApiError;
pub use status::StatusResponse;

use crate::{
    alerting::AlertEngine,
    config::AppConfig,
    context::AppMetrics,
    history::HistoryWindow,
    persistence::traits::KeyValueStore,
    recipients::RecipientRegistry,
    settings::SettingsStore,
    telemetry::TelemetrySource,
};

/// Shared state injected into every handler.
pub struct ApiState<T: KeyValueStore> {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The settings store.
    pub settings: Arc<SettingsStore<T>>,
    /// The recipient registry.
    pub registry: Arc<RecipientRegistry<T>>,
    /// The alert engine.
    pub engine: Arc<AlertEngine<T>>,
    /// The telemetry source, for on-demand alert checks.
    pub telemetry: Arc<dyn TelemetrySource>,
    /// The trend window.
    pub history: Arc<HistoryWindow>,
    /// Shared application metrics.
    pub app_metrics: AppMetrics,
}

impl<T: KeyValueStore> Clone for ApiState<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
            engine: Arc::clone(&self.engine),
            telemetry: Arc::clone(&self.telemetry),
            history: Arc::clone(&self.history),
            app_metrics: self.app_metrics.clone(),
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Handler returning the current trend window for chart frontends.
async fn trend<T: KeyValueStore + 'static>(State(state): State<ApiState<T>>) -> impl IntoResponse {
    Json(state.history.current().as_ref().clone())
}

/// Builds the API router over the given state.
pub fn router<T: KeyValueStore + 'static>(state: ApiState<T>) -> Router {
    let write_routes = Router::new()
        .route("/settings", post(settings::update_settings::<T>))
        .route("/settings/reset", post(settings::reset_settings::<T>))
        .route("/alerts/recipients", post(recipients::create_recipient::<T>))
        .route("/alerts/recipients/{id}", delete(recipients::delete_recipient::<T>))
        .route("/alerts/recipients/{id}/toggle", patch(recipients::toggle_recipient::<T>))
        .route("/alerts/test", post(alerts::send_test_alert::<T>))
        .route("/check-alerts", post(alerts::check_alerts::<T>));

    // Bearer auth only applies when an API key is configured.
    let write_routes = if state.config.server.api_key.is_some() {
        write_routes.layer(middleware::from_fn_with_state(state.clone(), auth::auth::<T>))
    } else {
        write_routes
    };

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status::status::<T>))
        .route("/settings", get(settings::get_settings::<T>))
        .route("/trend", get(trend::<T>))
        .route("/alerts/recipients", get(recipients::get_recipients::<T>))
        .route("/alerts/status", get(alerts::alert_status::<T>))
        .route("/alerts/history", get(alerts::alert_history::<T>))
        .merge(write_routes)
        .with_state(state)
}

/// Runs the HTTP server based on the provided application configuration.
pub async fn run_server_from_config<T: KeyValueStore + 'static>(state: ApiState<T>) {
    let addr: SocketAddr = state
        .config
        .server
        .listen_address
        .parse()
        .expect("Invalid server.listen_address format");

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
    tracing::info!(listen_address = %addr, "Operator API listening.");

    axum::serve(listener, app.into_make_service()).await.expect("Server failed");
}
