//! Pure threshold classification of sensor readings.
//!
//! Everything in this module is deterministic and side-effect free, so it is
//! safe to call on every poll tick. Noise-floor readings are still
//! classified here; they are excluded only from the trend window.

use serde::{Deserialize, Serialize};

use crate::models::{AlertEvent, AlertKind, Reading, ThresholdConfig};

/// Sensor supply voltage below this level raises a low-voltage warning.
pub const MIN_OPERATING_VOLTAGE: f64 = 3.0;

/// The live water-quality status of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// TDS within acceptable bounds.
    Normal,
    /// TDS inside the warning band.
    Warning,
    /// TDS above the critical threshold.
    Critical,
}

/// Classifies a reading against the current thresholds.
///
/// Critical uses a strict greater-than; the warning band is the half-open
/// range `(warning_threshold, tds_threshold]`. Without a configured warning
/// threshold the space collapses to Normal/Critical.
pub fn classify(reading: &Reading, config: &ThresholdConfig) -> Status {
    if reading.tds > config.tds_threshold {
        return Status::Critical;
    }
    match config.warning_threshold {
        Some(warning) if reading.tds > warning => Status::Warning,
        _ => Status::Normal,
    }
}

/// Derives every alert condition that holds for the reading.
///
/// Kinds are evaluated independently: a critical TDS excursion and a
/// temperature warning in the same reading yield two events, each gated by
/// its own cooldown timer downstream.
pub fn active_alerts(reading: &Reading, config: &ThresholdConfig) -> Vec<AlertEvent> {
    let mut events = Vec::new();

    match classify(reading, config) {
        Status::Critical => events.push(AlertEvent {
            kind: AlertKind::TdsCritical,
            current_value: reading.tds,
            threshold: config.tds_threshold,
        }),
        Status::Warning => events.push(AlertEvent {
            kind: AlertKind::TdsWarning,
            current_value: reading.tds,
            // The match arm is only reachable with a configured warning threshold.
            threshold: config.warning_threshold.unwrap_or(config.tds_threshold),
        }),
        Status::Normal => {}
    }

    if reading.temperature > config.temp_threshold {
        events.push(AlertEvent {
            kind: AlertKind::TempWarning,
            current_value: reading.temperature,
            threshold: config.temp_threshold,
        });
    }

    if reading.voltage < MIN_OPERATING_VOLTAGE {
        events.push(AlertEvent {
            kind: AlertKind::LowVoltage,
            current_value: reading.voltage,
            threshold: MIN_OPERATING_VOLTAGE,
        });
    }

    events
}
