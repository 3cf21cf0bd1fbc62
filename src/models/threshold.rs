//! The globally-shared threshold and alerting configuration.
//!
//! The serialized form uses the wire field names of the settings service
//! (`tdsThreshold`, `refreshInterval`, ...), so a blob round-trips unchanged
//! between the remote service, the local snapshot and the operator API.

use std::{collections::BTreeSet, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{deserialize_duration_from_ms, serialize_duration_to_ms},
    models::recipient::Channel,
};

fn default_cooldown_minutes() -> i64 {
    15
}

fn default_enabled_channels() -> BTreeSet<Channel> {
    BTreeSet::from([Channel::Telegram])
}

/// The singleton threshold configuration shared by every connected client.
///
/// Mutated only through [`crate::settings::SettingsStore::save`]; every
/// mutation stamps `last_modified` and `modified_by`, which drive the
/// explicit last-write-wins conflict resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    /// TDS level in ppm above which a reading is critical. Strict greater-than.
    pub tds_threshold: f64,

    /// Optional TDS level strictly below `tds_threshold` above which a
    /// reading is a warning. Absent means the warning band is unreachable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,

    /// Temperature in degrees Celsius above which a temperature warning fires.
    pub temp_threshold: f64,

    /// Optional operator email surfaced in alert footers.
    #[serde(default)]
    pub alert_email: Option<String>,

    /// Data-refresh cadence, milliseconds on the wire.
    #[serde(
        rename = "refreshInterval",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub refresh_interval: Duration,

    /// Minimum minutes between two dispatched notifications of the same
    /// alert kind.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,

    /// Channels notifications may go out on. Intersected with each
    /// recipient's subscriptions at fan-out time.
    #[serde(default = "default_enabled_channels")]
    pub enabled_channels: BTreeSet<Channel>,

    /// When this configuration was last mutated.
    pub last_modified: DateTime<Utc>,

    /// Who performed the last mutation.
    pub modified_by: String,
}

impl ThresholdConfig {
    /// The compiled-in defaults used when neither the remote service nor the
    /// local snapshot has a configuration.
    ///
    /// Stamped with the epoch so that any persisted or remote configuration
    /// wins the last-write-wins comparison against them.
    pub fn defaults() -> Self {
        Self {
            tds_threshold: 150.0,
            warning_threshold: None,
            temp_threshold: 35.0,
            alert_email: None,
            refresh_interval: Duration::from_millis(3000),
            cooldown_minutes: default_cooldown_minutes(),
            enabled_channels: default_enabled_channels(),
            last_modified: DateTime::UNIX_EPOCH,
            modified_by: "system".to_string(),
        }
    }

    /// Explicit last-write-wins comparison by modification timestamp.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.last_modified > other.last_modified
    }

    /// Validates the configuration invariants.
    pub fn validate(&self) -> Result<(), ThresholdConfigError> {
        if self.tds_threshold <= 0.0 {
            return Err(ThresholdConfigError::NonPositiveTdsThreshold(self.tds_threshold));
        }
        if let Some(warning) = self.warning_threshold {
            if warning >= self.tds_threshold {
                return Err(ThresholdConfigError::WarningNotBelowCritical {
                    warning,
                    critical: self.tds_threshold,
                });
            }
        }
        if self.refresh_interval.is_zero() {
            return Err(ThresholdConfigError::NonPositiveRefreshInterval);
        }
        if self.cooldown_minutes < 0 {
            return Err(ThresholdConfigError::NegativeCooldown(self.cooldown_minutes));
        }
        Ok(())
    }
}

/// Errors produced by [`ThresholdConfig::validate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ThresholdConfigError {
    /// The critical TDS threshold must be strictly positive.
    #[error("TDS threshold must be positive, got {0}")]
    NonPositiveTdsThreshold(f64),

    /// The warning threshold must be strictly below the critical threshold.
    #[error("warning threshold {warning} must be strictly below the TDS threshold {critical}")]
    WarningNotBelowCritical {
        /// The offending warning threshold.
        warning: f64,
        /// The configured critical threshold.
        critical: f64,
    },

    /// The data refresh interval must be strictly positive.
    #[error("refresh interval must be positive")]
    NonPositiveRefreshInterval,

    /// The cooldown may be zero (no throttling) but never negative.
    #[error("cooldown minutes must not be negative, got {0}")]
    NegativeCooldown(i64),
}

/// A partial update merged onto the current configuration by
/// [`crate::settings::SettingsStore::save`]. Absent fields keep their
/// current values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdate {
    /// New critical TDS threshold.
    #[serde(default)]
    pub tds_threshold: Option<f64>,

    /// New warning TDS threshold.
    #[serde(default)]
    pub warning_threshold: Option<f64>,

    /// New temperature threshold.
    #[serde(default)]
    pub temp_threshold: Option<f64>,

    /// New operator email.
    #[serde(default)]
    pub alert_email: Option<String>,

    /// New data-refresh cadence, milliseconds.
    #[serde(rename = "refreshInterval", default)]
    pub refresh_interval_ms: Option<u64>,

    /// New cooldown in minutes.
    #[serde(default)]
    pub cooldown_minutes: Option<i64>,

    /// New enabled channel set.
    #[serde(default)]
    pub enabled_channels: Option<BTreeSet<Channel>>,

    /// The actor performing the update, when the caller supplies one.
    #[serde(default)]
    pub modified_by: Option<String>,
}

impl ThresholdUpdate {
    /// Merges this partial update onto `current`, stamping the modification
    /// metadata. Does not validate; callers validate the merged result.
    pub fn apply_to(&self, current: &ThresholdConfig, actor: &str) -> ThresholdConfig {
        ThresholdConfig {
            tds_threshold: self.tds_threshold.unwrap_or(current.tds_threshold),
            warning_threshold: self.warning_threshold.or(current.warning_threshold),
            temp_threshold: self.temp_threshold.unwrap_or(current.temp_threshold),
            alert_email: self.alert_email.clone().or_else(|| current.alert_email.clone()),
            refresh_interval: self
                .refresh_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(current.refresh_interval),
            cooldown_minutes: self.cooldown_minutes.unwrap_or(current.cooldown_minutes),
            enabled_channels: self
                .enabled_channels
                .clone()
                .unwrap_or_else(|| current.enabled_channels.clone()),
            last_modified: Utc::now(),
            modified_by: actor.to_string(),
        }
    }
}
