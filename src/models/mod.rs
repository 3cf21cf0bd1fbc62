//! This module contains the data models for the Undine application.

pub mod alert;
pub mod notification;
pub mod reading;
pub mod recipient;
pub mod threshold;

pub use alert::{AlertEvent, AlertKind, AlertRecord, DeliveryReport, Severity};
pub use notification::NotificationMessage;
pub use reading::{NOISE_FLOOR_PPM, Reading, TelemetrySnapshot};
pub use recipient::{Channel, Recipient, RecipientSpec, RecipientValidationError, Role};
pub use threshold::{ThresholdConfig, ThresholdConfigError, ThresholdUpdate};
