//! Alert kinds, dispatch outcomes and the persisted alert history record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::recipient::Channel;

/// The distinct alert conditions. Each kind owns an independent cooldown
/// timer, so a TDS alert firing never suppresses a temperature alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// TDS above the critical threshold.
    TdsCritical,
    /// TDS inside the warning band.
    TdsWarning,
    /// Temperature above the temperature threshold.
    TempWarning,
    /// Sensor supply voltage below the minimum operating level.
    LowVoltage,
}

impl AlertKind {
    /// All kinds, in evaluation order.
    pub const ALL: [AlertKind; 4] =
        [AlertKind::TdsCritical, AlertKind::TdsWarning, AlertKind::TempWarning, AlertKind::LowVoltage];

    /// Stable snake_case name used in state keys, logs and history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::TdsCritical => "tds_critical",
            AlertKind::TdsWarning => "tds_warning",
            AlertKind::TempWarning => "temp_warning",
            AlertKind::LowVoltage => "low_voltage",
        }
    }

    /// The severity attached to notifications of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::TdsCritical => Severity::Critical,
            AlertKind::TdsWarning | AlertKind::TempWarning | AlertKind::LowVoltage =>
                Severity::Warning,
        }
    }

    /// The monitored parameter this kind reports on.
    pub fn parameter(&self) -> &'static str {
        match self {
            AlertKind::TdsCritical | AlertKind::TdsWarning => "TDS",
            AlertKind::TempWarning => "Temperature",
            AlertKind::LowVoltage => "Voltage",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious an alert is, surfaced in messages and history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational (test alerts).
    Info,
    /// Needs attention soon.
    Warning,
    /// Needs attention now.
    Critical,
}

/// An active alert condition derived from the latest reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvent {
    /// Which condition is active.
    pub kind: AlertKind,
    /// The current value of the offending parameter.
    pub current_value: f64,
    /// The threshold it crossed.
    pub threshold: f64,
}

/// Aggregated outcome of one dispatch fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Active recipients considered for this fan-out.
    pub recipients_total: usize,
    /// Per-channel deliveries that succeeded.
    pub sent_successfully: usize,
    /// Per-channel deliveries that failed.
    pub failed: usize,
}

impl DeliveryReport {
    /// Records one delivery attempt.
    pub fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.sent_successfully += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// A dispatched alert as retained in the bounded history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Position in the history log.
    pub id: u64,
    /// The alert kind, or "test" for manual test alerts.
    pub alert_type: String,
    /// Severity at dispatch time.
    pub severity: Severity,
    /// The rendered message body that went out.
    pub message: String,
    /// TDS at dispatch time, when triggered by a reading.
    #[serde(default)]
    pub tds_value: Option<f64>,
    /// Temperature at dispatch time, when triggered by a reading.
    #[serde(default)]
    pub temp_value: Option<f64>,
    /// Voltage at dispatch time, when triggered by a reading.
    #[serde(default)]
    pub voltage_value: Option<f64>,
    /// The threshold that was crossed.
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Names of the recipients notified.
    pub recipients_notified: Vec<String>,
    /// Channels used for the fan-out.
    pub channels_used: Vec<Channel>,
    /// Aggregated delivery outcome.
    pub delivery: DeliveryReport,
    /// When the alert went out.
    pub created_at: DateTime<Utc>,
}
