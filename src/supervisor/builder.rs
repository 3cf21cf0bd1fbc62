//! Construction and wiring of the [`Supervisor`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::{
    alerting::{AlertDispatcher, AlertEngine},
    channels::build_channel_notifiers,
    config::AppConfig,
    context::AppMetrics,
    history::HistoryWindow,
    http_client::HttpClientPool,
    persistence::traits::KeyValueStore,
    recipients::RecipientRegistry,
    settings::{SettingsApi, SettingsStore},
    telemetry::TelemetrySource,
};

/// Assembles the supervisor's components and wires their dependencies.
pub struct SupervisorBuilder<T: KeyValueStore + 'static> {
    config: Option<AppConfig>,
    state: Option<Arc<T>>,
    telemetry: Option<Arc<dyn TelemetrySource>>,
    settings_api: Option<Arc<dyn SettingsApi>>,
    client_pool: Option<Arc<HttpClientPool>>,
}

impl<T: KeyValueStore + Send + Sync + 'static> SupervisorBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            config: None,
            state: None,
            telemetry: None,
            settings_api: None,
            client_pool: None,
        }
    }

    /// Sets the application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state repository.
    pub fn state(mut self, state: Arc<T>) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the telemetry source.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Sets the remote settings service client.
    pub fn settings_api(mut self, settings_api: Arc<dyn SettingsApi>) -> Self {
        self.settings_api = Some(settings_api);
        self
    }

    /// Sets the shared HTTP client pool.
    pub fn client_pool(mut self, client_pool: Arc<HttpClientPool>) -> Self {
        self.client_pool = Some(client_pool);
        self
    }

    /// Wires everything together.
    pub async fn build(self) -> Result<Supervisor<T>, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let state = self.state.ok_or(SupervisorError::MissingStateRepository)?;
        let telemetry = self.telemetry.ok_or(SupervisorError::MissingTelemetrySource)?;
        let client_pool = self.client_pool.unwrap_or_default();

        let notifiers =
            build_channel_notifiers(&config.channels, &config.http_retry_config, &client_pool)
                .await?;

        let registry = Arc::new(RecipientRegistry::new(Arc::clone(&state)));
        let dispatcher = Arc::new(AlertDispatcher::new(notifiers, Arc::clone(&registry)));
        let engine = Arc::new(AlertEngine::new(dispatcher, Arc::clone(&state)));
        let settings = Arc::new(SettingsStore::new(self.settings_api, Arc::clone(&state)));
        let history = Arc::new(HistoryWindow::new(config.history_window));

        Ok(Supervisor {
            config: Arc::new(config),
            state,
            app_metrics: AppMetrics::default(),
            telemetry,
            history,
            settings,
            registry,
            engine,
            cancellation_token: CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        })
    }
}

impl<T: KeyValueStore + Send + Sync + 'static> Default for SupervisorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
