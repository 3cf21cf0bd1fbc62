//! This module defines the interface for fetching sensor telemetry from the
//! cloud channel feed.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{http_client::HttpClientPoolError, models::TelemetrySnapshot};

mod feed;

pub use feed::ChannelFeedClient;

/// Custom error type for telemetry operations.
///
/// A failed poll is "no update this tick", never fatal: the polling loop
/// logs it and keeps the last-known state.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed service could not be reached.
    #[error("Feed transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The feed service answered with a non-success status.
    #[error("Feed API error: HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The feed response body could not be decoded.
    #[error("Failed to decode feed response: {0}")]
    Decode(#[from] reqwest::Error),

    /// No HTTP client could be obtained from the pool.
    #[error("HTTP client pool error: {0}")]
    Pool(#[from] HttpClientPoolError),
}

/// A trait for a data source that can fetch sensor telemetry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetches the current authoritative snapshot: the latest reading plus
    /// recent history, oldest first.
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, FeedError>;
}
