//! The Supervisor module manages the lifecycle of the Undine daemon.
//!
//! The supervisor owns every major component — the feed poller, the
//! settings store, the alert engine and the operator API — and runs the
//! three independently-cadenced polling loops:
//!
//! - **data refresh**: fetch the feed, replace the trend window, classify
//!   the latest reading. Cadence follows the *current* settings, so an
//!   admin changing the refresh interval takes effect within one tick.
//! - **settings refresh**: re-load the threshold configuration, the only
//!   cross-client consistency mechanism.
//! - **alert check**: run one cooldown-engine evaluation against the latest
//!   reading.
//!
//! Each loop is a supervised tokio task; a slow tick in one never blocks
//! the others. Shutdown cancels every loop through a shared
//! `CancellationToken` and cleans up with a bounded timeout.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    alerting::{AlertCheckReport, AlertEngine, AlertEngineError},
    channels::ChannelError,
    classifier::classify,
    config::AppConfig,
    context::AppMetrics,
    history::HistoryWindow,
    http_server::{self, ApiState},
    persistence::{error::PersistenceError, traits::KeyValueStore},
    recipients::RecipientRegistry,
    settings::SettingsStore,
    telemetry::{FeedError, TelemetrySource},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state repository was not provided to the `SupervisorBuilder`.
    #[error("Missing state repository for Supervisor")]
    MissingStateRepository,

    /// A telemetry source was not provided to the `SupervisorBuilder`.
    #[error("Missing telemetry source for Supervisor")]
    MissingTelemetrySource,

    /// A notification channel failed to initialize.
    #[error("Channel initialization error: {0}")]
    ChannelInit(#[from] ChannelError),

    /// The feed could not be polled during a one-shot check.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// The alert engine failed.
    #[error("Alert engine error: {0}")]
    AlertEngine(#[from] AlertEngineError),

    /// The state repository failed.
    #[error("State repository error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// The primary runtime manager for the application.
///
/// The Supervisor owns all the major components (services) and is
/// responsible for their startup, shutdown, and health monitoring. Once
/// `run` is called, it becomes the main process loop for the entire
/// application.
pub struct Supervisor<T: KeyValueStore + 'static> {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The persistent state repository for managing application state.
    state: Arc<T>,

    /// The shared application metrics.
    app_metrics: AppMetrics,

    /// The telemetry source polling the channel feed.
    telemetry: Arc<dyn TelemetrySource>,

    /// The bounded trend window.
    history: Arc<HistoryWindow>,

    /// The authoritative settings store.
    settings: Arc<SettingsStore<T>>,

    /// The recipient registry.
    registry: Arc<RecipientRegistry<T>>,

    /// The alert cooldown engine.
    engine: Arc<AlertEngine<T>>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl<T: KeyValueStore + Send + Sync + 'static> Supervisor<T> {
    /// Returns a new `SupervisorBuilder` instance.
    ///
    /// This is the public entry point for creating a supervisor.
    pub fn builder() -> SupervisorBuilder<T> {
        SupervisorBuilder::<T>::new()
    }

    /// Performs one alert-check cycle: refresh settings, fetch the feed,
    /// evaluate the engine. Used by the `check-alerts` subcommand.
    pub async fn check_alerts_once(&self) -> Result<AlertCheckReport, SupervisorError> {
        let config = self.settings.load().await;
        let snapshot = self.telemetry.fetch_snapshot().await?;
        let Some(reading) = snapshot.latest else {
            tracing::warn!("Feed returned no readings; nothing to evaluate.");
            return Ok(AlertCheckReport {
                status: crate::classifier::Status::Normal,
                fired: Vec::new(),
                suppressed: Vec::new(),
            });
        };
        Ok(self.engine.evaluate(&reading, &config).await?)
    }

    /// Starts the supervisor and all its managed services.
    ///
    /// This method is the main entry point for the application's runtime. It
    /// performs the following steps:
    /// 1. Spawns a signal handler to listen for `SIGINT` (Ctrl+C) and
    ///    `SIGTERM`.
    /// 2. Spawns the HTTP server and the three polling loops as supervised
    ///    background tasks.
    /// 3. Enters the main supervision loop, which concurrently monitors the
    ///    health of all spawned tasks and the shutdown signal.
    /// 4. Upon shutdown, waits for all tasks to complete and performs
    ///    graceful cleanup of resources with a bounded timeout.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        // Adopt whatever configuration is reachable before the loops start.
        self.settings.load().await;

        // Clone the token for the signal handler task.
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
            }

            // Notify all other tasks to begin shutting down.
            cancellation_token.cancel();
        });

        // Spawn the HTTP server as a background task.
        if self.config.server.enabled {
            let api_state = ApiState {
                config: Arc::clone(&self.config),
                settings: Arc::clone(&self.settings),
                registry: Arc::clone(&self.registry),
                engine: Arc::clone(&self.engine),
                telemetry: Arc::clone(&self.telemetry),
                history: Arc::clone(&self.history),
                app_metrics: self.app_metrics.clone(),
            };
            let http_cancellation_token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                tokio::select! {
                    _ = http_server::run_server_from_config(api_state) => {},
                    _ = http_cancellation_token.cancelled() => {
                        tracing::info!("HTTP server received shutdown signal.");
                    }
                }
            });
        }

        // --- Polling loops ---

        self.join_set.spawn(run_data_refresh(
            Arc::clone(&self.settings),
            Arc::clone(&self.telemetry),
            Arc::clone(&self.history),
            self.app_metrics.clone(),
            self.cancellation_token.clone(),
        ));

        self.join_set.spawn(run_settings_refresh(
            Arc::clone(&self.settings),
            self.config.settings_sync.refresh_interval,
            self.cancellation_token.clone(),
        ));

        self.join_set.spawn(run_alert_check(
            Arc::clone(&self.engine),
            Arc::clone(&self.settings),
            self.app_metrics.clone(),
            self.config.alert_check_interval,
            self.cancellation_token.clone(),
        ));

        // --- Main Supervisor Loop ---
        // Only responsible for monitoring task health and shutdown signals.

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {
                            // Task completed successfully, continue monitoring.
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => {
                            // All tasks have completed.
                            break;
                        }
                    }
                }
                _ = self.cancellation_token.cancelled() => {
                    // Cancellation requested externally, break the loop.
                    break;
                }
            }
        }

        // --- Graceful Shutdown ---

        // Ensure all spawned tasks are properly awaited before cleanup.
        self.join_set.shutdown().await;
        tracing::info!("All supervised tasks have completed.");

        tracing::info!("Starting graceful resource cleanup...");
        let shutdown_timeout = self.config.shutdown_timeout;

        let cleanup_logic = async {
            if let Err(e) = self.state.flush().await {
                tracing::error!(error = %e, "Failed to flush pending writes, but continuing cleanup.");
            }
            tracing::info!(
                total_alerts_sent = self.engine.total_sent(),
                "Final state: delivery counters recorded."
            );
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Continuing shutdown.",
                shutdown_timeout
            );
        } else {
            tracing::info!("Cleanup completed successfully.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}

/// The data-refresh loop: fetch the feed, replace the trend window, record
/// the latest classified reading.
///
/// The sleep is re-derived from the current settings every iteration, so an
/// interval change propagates within one tick.
async fn run_data_refresh<T: KeyValueStore>(
    settings: Arc<SettingsStore<T>>,
    telemetry: Arc<dyn TelemetrySource>,
    history: Arc<HistoryWindow>,
    metrics: AppMetrics,
    cancellation_token: CancellationToken,
) {
    loop {
        let interval = settings.current().await.refresh_interval;

        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                tracing::info!("Data refresh loop cancellation signal received, shutting down...");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                match telemetry.fetch_snapshot().await {
                    Ok(snapshot) => {
                        history.replace(&snapshot.history);
                        let status = match snapshot.latest {
                            Some(reading) =>
                                Some(classify(&reading, &settings.current().await)),
                            None => None,
                        };
                        metrics.record_poll(snapshot.latest, status).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Feed poll failed; keeping last-known state.");
                        metrics.record_poll_failure().await;
                    }
                }
            }
        }
    }
    tracing::info!("Data refresh loop has shut down.");
}

/// The settings-refresh loop, keeping multi-client configuration in sync.
async fn run_settings_refresh<T: KeyValueStore>(
    settings: Arc<SettingsStore<T>>,
    interval: std::time::Duration,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                tracing::info!("Settings refresh loop cancellation signal received, shutting down...");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                settings.load().await;
            }
        }
    }
    tracing::info!("Settings refresh loop has shut down.");
}

/// The alert-check loop, driving the cooldown engine on its own slower
/// cadence.
async fn run_alert_check<T: KeyValueStore>(
    engine: Arc<AlertEngine<T>>,
    settings: Arc<SettingsStore<T>>,
    metrics: AppMetrics,
    interval: std::time::Duration,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                tracing::info!("Alert check loop cancellation signal received, shutting down...");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                let Some(reading) = metrics.latest_reading().await else {
                    tracing::debug!("No reading ingested yet; skipping alert check.");
                    continue;
                };
                let config = settings.current().await;
                match engine.evaluate(&reading, &config).await {
                    Ok(report) => {
                        if !report.fired.is_empty() {
                            tracing::info!(
                                fired = report.fired.len(),
                                suppressed = report.suppressed.len(),
                                "Alert check dispatched notifications."
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Alert check cycle failed.");
                    }
                }
            }
        }
    }
    tracing::info!("Alert check loop has shut down.");
}
