//! Error types for notification channel delivery.

use thiserror::Error;

use crate::{http_client::HttpClientPoolError, models::Channel};

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The recipient subscribed to the channel but carries no address for
    /// it. Caught at registration time; this guards stale stored state.
    #[error("Recipient has no address for channel '{0}'")]
    MissingAddress(Channel),

    /// The transport could not be reached.
    #[error("Channel transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The provider answered with a non-success status.
    #[error("Channel '{channel}' delivery failed: HTTP {status}")]
    Status {
        /// The channel that failed.
        channel: Channel,
        /// The provider's HTTP status.
        status: reqwest::StatusCode,
    },

    /// The channel configuration is unusable.
    #[error("Channel configuration error: {0}")]
    Config(String),

    /// No HTTP client could be obtained from the pool.
    #[error("HTTP client pool error: {0}")]
    Pool(#[from] HttpClientPoolError),
}
