//! Shared HTTP client infrastructure.
//!
//! Every outbound HTTP concern — polling the channel feed, synchronizing
//! settings, delivering notifications — goes through a retrying client
//! obtained from the [`HttpClientPool`].

mod client;
mod pool;

pub use client::create_retryable_http_client;
pub use pool::{HttpClientPool, HttpClientPoolError};
