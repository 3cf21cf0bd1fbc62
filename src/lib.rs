#![warn(missing_docs)]
//! Undine is a water-quality telemetry monitoring daemon: it polls a cloud
//! channel feed for TDS sensor readings, classifies them against
//! operator-managed thresholds and dispatches cooldown-gated alert
//! notifications over Telegram, email and SMS.

pub mod alerting;
pub mod channels;
pub mod classifier;
pub mod config;
pub mod context;
pub mod history;
pub mod http_client;
pub mod http_server;
pub mod models;
pub mod persistence;
pub mod recipients;
pub mod settings;
pub mod supervisor;
pub mod telemetry;
pub mod test_helpers;
