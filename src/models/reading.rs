//! Sensor reading types produced by the cloud channel feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readings at or below this TDS value are treated as sensor noise and
/// excluded from the trend window. They are still classified for live
/// status, so a genuine excursion is never suppressed for looking odd.
pub const NOISE_FLOOR_PPM: f64 = 20.0;

/// A single immutable sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor supply voltage in volts.
    pub voltage: f64,
    /// Total dissolved solids in parts per million.
    pub tds: f64,
    /// Water temperature in degrees Celsius.
    pub temperature: f64,
    /// When the feed recorded the reading.
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Whether this reading belongs in the trend window.
    pub fn is_trend_worthy(&self) -> bool {
        self.tds > NOISE_FLOOR_PPM
    }
}

/// An authoritative snapshot returned by one feed poll: the latest reading
/// plus the recent history, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// The most recent reading, if the channel has any entries at all.
    pub latest: Option<Reading>,
    /// Recent readings in arrival order.
    pub history: Vec<Reading>,
}
