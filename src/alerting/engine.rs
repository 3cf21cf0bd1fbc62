//! The alert cooldown engine.
//!
//! Per alert kind the engine runs a small state machine: Idle while the
//! condition is clear, Eligible when it holds and the cooldown window is
//! open, Fired once a notification goes out. The last-fired stamp for each
//! kind is persisted in the state store, so a daemon restart inside an open
//! window cannot re-spam recipients.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    classifier::{Status, active_alerts, classify},
    models::{AlertEvent, AlertKind, AlertRecord, DeliveryReport, Reading, Severity, ThresholdConfig},
    persistence::{error::PersistenceError, traits::KeyValueStore},
    recipients::RegistryError,
};

use super::dispatcher::{AlertDispatcher, TestAlertOutcome};

/// Prefix of the per-kind cooldown state keys.
pub const COOLDOWN_STATE_PREFIX: &str = "cooldown_state:";

/// The state-store key holding the bounded alert history.
pub const ALERT_HISTORY_STATE_KEY: &str = "alert_history";

/// Only the most recent alerts are retained.
const ALERT_HISTORY_LIMIT: usize = 100;

/// The persisted cooldown state of one alert kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindCooldownState {
    /// When a notification of this kind last went out.
    pub last_fired_at: DateTime<Utc>,
}

/// Errors that can occur within the alert engine.
#[derive(Debug, Error)]
pub enum AlertEngineError {
    /// Error occurred in the state repository.
    #[error("State repository error: {0}")]
    StateRepository(#[from] PersistenceError),

    /// Error occurred reading the recipient registry.
    #[error("Recipient registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// An alert that fired during an evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct FiredAlert {
    /// The kind that fired.
    pub kind: AlertKind,
    /// Aggregated delivery outcome.
    pub report: DeliveryReport,
}

/// An active condition held back by its cooldown window.
#[derive(Debug, Clone, Serialize)]
pub struct SuppressedAlert {
    /// The suppressed kind.
    pub kind: AlertKind,
    /// Seconds until the kind becomes eligible again.
    pub cooldown_remaining_secs: i64,
}

/// The outcome of one engine evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct AlertCheckReport {
    /// Live status of the evaluated reading.
    pub status: Status,
    /// Kinds that dispatched this tick.
    pub fired: Vec<FiredAlert>,
    /// Kinds active but inside their cooldown window.
    pub suppressed: Vec<SuppressedAlert>,
}

/// Observability of one kind's cooldown timer.
#[derive(Debug, Clone, Serialize)]
pub struct KindCooldownStatus {
    /// The alert kind.
    pub kind: AlertKind,
    /// When it last fired, if ever.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Seconds left in the current window; zero when eligible.
    pub cooldown_remaining_secs: i64,
    /// Whether a dispatch would be permitted right now.
    pub can_fire: bool,
}

/// The alert cooldown engine.
pub struct AlertEngine<T: KeyValueStore> {
    /// The dispatcher performing multi-channel fan-out.
    dispatcher: Arc<AlertDispatcher<T>>,

    /// The state repository persisting cooldown stamps and history.
    state: Arc<T>,

    /// A map of alert kinds to their locks to prevent race conditions
    /// between the periodic check and manual `/check-alerts` calls.
    kind_locks: DashMap<AlertKind, Arc<Mutex<()>>>,

    /// Successful per-channel deliveries this session.
    total_sent: AtomicU64,
}

impl<T: KeyValueStore> AlertEngine<T> {
    /// Creates a new AlertEngine instance.
    pub fn new(dispatcher: Arc<AlertDispatcher<T>>, state: Arc<T>) -> Self {
        Self {
            dispatcher,
            state,
            kind_locks: DashMap::new(),
            total_sent: AtomicU64::new(0),
        }
    }

    /// Evaluates the latest reading now.
    pub async fn evaluate(
        &self,
        reading: &Reading,
        config: &ThresholdConfig,
    ) -> Result<AlertCheckReport, AlertEngineError> {
        self.evaluate_at(reading, config, Utc::now()).await
    }

    /// Evaluates the latest reading at an explicit instant.
    ///
    /// One transition per kind and tick: an inactive condition goes Idle
    /// (its stamp is retained), an active one fires when its window is open
    /// (`>=` exactly at the boundary) and is suppressed otherwise.
    pub async fn evaluate_at(
        &self,
        reading: &Reading,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> Result<AlertCheckReport, AlertEngineError> {
        let mut report = AlertCheckReport {
            status: classify(reading, config),
            fired: Vec::new(),
            suppressed: Vec::new(),
        };

        for event in active_alerts(reading, config) {
            self.process_event(&event, reading, config, now, &mut report).await?;
        }

        Ok(report)
    }

    /// Applies the cooldown gate to one active condition and dispatches when
    /// eligible.
    async fn process_event(
        &self,
        event: &AlertEvent,
        reading: &Reading,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
        report: &mut AlertCheckReport,
    ) -> Result<(), AlertEngineError> {
        let kind = event.kind;
        let lock = self.kind_lock(kind);
        let _guard = lock.lock().await;

        let state_key = Self::state_key(kind);
        let cooldown = Duration::minutes(config.cooldown_minutes);

        // Retrieve the persisted stamp; a retrieval error must not halt
        // alerting, so it reads as "never fired".
        let cooldown_state = match self.state.get_json_state::<KindCooldownState>(&state_key).await
        {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, kind = %kind, "Failed to retrieve cooldown state.");
                None
            }
        };

        if let Some(state) = &cooldown_state {
            let elapsed = now.signed_duration_since(state.last_fired_at);
            if elapsed < cooldown {
                let remaining = (cooldown - elapsed).num_seconds();
                tracing::debug!(
                    kind = %kind,
                    remaining_secs = remaining,
                    "Alert condition active but inside cooldown window."
                );
                report
                    .suppressed
                    .push(SuppressedAlert { kind, cooldown_remaining_secs: remaining });
                return Ok(());
            }
        }

        tracing::info!(
            kind = %kind,
            value = event.current_value,
            threshold = event.threshold,
            "Dispatching alert."
        );
        let outcome = self.dispatcher.dispatch_event(event, reading, config).await?;

        // The stamp is recorded even when every delivery failed: the
        // cooldown window itself is the retry schedule.
        if let Err(e) = self
            .state
            .set_json_state(&state_key, &KindCooldownState { last_fired_at: now })
            .await
        {
            tracing::error!(error = %e, kind = %kind, "Failed to save cooldown state.");
        }

        self.total_sent.fetch_add(outcome.report.sent_successfully as u64, Ordering::Relaxed);

        let record = AlertRecord {
            id: 0, // Assigned by append_history.
            alert_type: kind.as_str().to_string(),
            severity: kind.severity(),
            message: outcome.message.body.clone(),
            tds_value: Some(reading.tds),
            temp_value: Some(reading.temperature),
            voltage_value: Some(reading.voltage),
            threshold: Some(event.threshold),
            recipients_notified: outcome.recipients_notified.clone(),
            channels_used: outcome.channels_used.clone(),
            delivery: outcome.report,
            created_at: now,
        };
        self.append_history(record).await;

        report.fired.push(FiredAlert { kind, report: outcome.report });
        Ok(())
    }

    /// Sends a manual test alert, bypassing the cooldown gate, and records
    /// it in the history.
    pub async fn send_test(
        &self,
        text: Option<String>,
        config: &ThresholdConfig,
    ) -> Result<TestAlertOutcome, AlertEngineError> {
        let (test_outcome, outcome) = self.dispatcher.send_test(text, config).await?;

        self.total_sent
            .fetch_add(test_outcome.report.sent_successfully as u64, Ordering::Relaxed);
        self.append_history(AlertRecord {
            id: 0,
            alert_type: "test".to_string(),
            severity: Severity::Info,
            message: outcome.message.body.clone(),
            tds_value: None,
            temp_value: None,
            voltage_value: None,
            threshold: None,
            recipients_notified: outcome.recipients_notified.clone(),
            channels_used: outcome.channels_used.clone(),
            delivery: outcome.report,
            created_at: Utc::now(),
        })
        .await;

        Ok(test_outcome)
    }

    /// The cooldown timers of every kind, for the alert status endpoint.
    pub async fn cooldown_status(
        &self,
        config: &ThresholdConfig,
    ) -> Result<Vec<KindCooldownStatus>, AlertEngineError> {
        let now = Utc::now();
        let cooldown = Duration::minutes(config.cooldown_minutes);
        let mut statuses = Vec::with_capacity(AlertKind::ALL.len());

        for kind in AlertKind::ALL {
            let state = self
                .state
                .get_json_state::<KindCooldownState>(&Self::state_key(kind))
                .await?;
            let (last_fired_at, remaining) = match &state {
                Some(state) => {
                    let elapsed = now.signed_duration_since(state.last_fired_at);
                    (Some(state.last_fired_at), (cooldown - elapsed).num_seconds().max(0))
                }
                None => (None, 0),
            };
            statuses.push(KindCooldownStatus {
                kind,
                last_fired_at,
                cooldown_remaining_secs: remaining,
                can_fire: remaining == 0,
            });
        }
        Ok(statuses)
    }

    /// The most recent dispatched alerts, oldest first, at most `limit`.
    pub async fn history(&self, limit: usize) -> Result<Vec<AlertRecord>, AlertEngineError> {
        let records = self
            .state
            .get_json_state::<Vec<AlertRecord>>(ALERT_HISTORY_STATE_KEY)
            .await?
            .unwrap_or_default();
        let start = records.len().saturating_sub(limit);
        Ok(records[start..].to_vec())
    }

    /// Successful per-channel deliveries this session.
    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    /// The dispatcher, for status queries (bot identity, channel presence).
    pub fn dispatcher(&self) -> &AlertDispatcher<T> {
        &self.dispatcher
    }

    /// Gets or creates the lock for an alert kind.
    fn kind_lock(&self, kind: AlertKind) -> Arc<Mutex<()>> {
        self.kind_locks.entry(kind).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// The state-store key for a kind's cooldown stamp.
    fn state_key(kind: AlertKind) -> String {
        format!("{COOLDOWN_STATE_PREFIX}{kind}")
    }

    /// Appends a record to the bounded history. Failures are logged; the
    /// alert already went out.
    async fn append_history(&self, mut record: AlertRecord) {
        let mut records = match self
            .state
            .get_json_state::<Vec<AlertRecord>>(ALERT_HISTORY_STATE_KEY)
            .await
        {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read alert history, starting fresh.");
                Vec::new()
            }
        };

        record.id = records.last().map_or(1, |last| last.id + 1);
        records.push(record);
        let start = records.len().saturating_sub(ALERT_HISTORY_LIMIT);
        let bounded = records[start..].to_vec();

        if let Err(e) = self.state.set_json_state(ALERT_HISTORY_STATE_KEY, &bounded).await {
            tracing::error!(error = %e, "Failed to save alert history.");
        }
    }
}
