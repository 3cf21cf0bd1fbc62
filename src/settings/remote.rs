//! Client for the remote settings service.
//!
//! The service is the cross-client source of truth for the threshold
//! configuration. Every response wraps the settings in a
//! `{"status": "success", "settings": {...}}` envelope; the echoed settings
//! are canonical (the server may normalize values).

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::models::ThresholdConfig;

/// Errors that can occur while talking to the remote settings service.
#[derive(Debug, Error)]
pub enum SettingsApiError {
    /// The service could not be reached.
    #[error("Settings transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The service answered with a non-success HTTP status.
    #[error("Settings API error: HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The response body could not be decoded.
    #[error("Failed to decode settings response: {0}")]
    Decode(#[from] reqwest::Error),

    /// The service answered but rejected the operation.
    #[error("Settings service rejected the request: {0}")]
    Rejected(String),

    /// The configured base URL cannot address the settings endpoints.
    #[error("Invalid settings service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// The `{status, settings}` envelope returned by every settings endpoint.
#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    status: String,
    settings: ThresholdConfig,
}

impl SettingsEnvelope {
    fn into_settings(self) -> Result<ThresholdConfig, SettingsApiError> {
        if self.status == "success" {
            Ok(self.settings)
        } else {
            Err(SettingsApiError::Rejected(self.status))
        }
    }
}

/// The remote settings service interface.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Fetches the current remote configuration.
    async fn fetch(&self) -> Result<ThresholdConfig, SettingsApiError>;

    /// Persists a configuration remotely, returning the server's canonical
    /// echo.
    async fn persist(&self, config: &ThresholdConfig) -> Result<ThresholdConfig, SettingsApiError>;

    /// Resets the remote configuration to its defaults, returning them.
    async fn reset(&self) -> Result<ThresholdConfig, SettingsApiError>;
}

/// HTTP implementation of [`SettingsApi`].
pub struct HttpSettingsApi {
    settings_url: Url,
    reset_url: Url,
    client: Arc<ClientWithMiddleware>,
}

impl HttpSettingsApi {
    /// Creates a client for the service rooted at `base_url`.
    pub fn new(base_url: &Url, client: Arc<ClientWithMiddleware>) -> Result<Self, SettingsApiError> {
        let base = base_url.as_str().trim_end_matches('/');
        Ok(Self {
            settings_url: Url::parse(&format!("{base}/settings"))?,
            reset_url: Url::parse(&format!("{base}/settings/reset"))?,
            client,
        })
    }

    async fn decode(response: reqwest::Response) -> Result<ThresholdConfig, SettingsApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SettingsApiError::Status(status));
        }
        let envelope: SettingsEnvelope = response.json().await?;
        envelope.into_settings()
    }
}

#[async_trait]
impl SettingsApi for HttpSettingsApi {
    async fn fetch(&self) -> Result<ThresholdConfig, SettingsApiError> {
        let response = self.client.get(self.settings_url.clone()).send().await?;
        Self::decode(response).await
    }

    async fn persist(&self, config: &ThresholdConfig) -> Result<ThresholdConfig, SettingsApiError> {
        let response =
            self.client.post(self.settings_url.clone()).json(config).send().await?;
        Self::decode(response).await
    }

    async fn reset(&self) -> Result<ThresholdConfig, SettingsApiError> {
        let response = self.client.post(self.reset_url.clone()).send().await?;
        Self::decode(response).await
    }
}
