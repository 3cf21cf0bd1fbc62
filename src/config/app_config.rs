use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{HttpRetryConfig, ServerConfig, deserialize_duration_from_seconds};

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for alert_check_interval.
fn default_alert_check_interval() -> Duration {
    Duration::from_secs(60)
}

/// Provides the default value for history_window.
fn default_history_window() -> usize {
    40
}

/// Provides the default value for feed.base_url.
fn default_feed_base_url() -> Url {
    Url::parse("https://api.thingspeak.com").expect("static URL is valid")
}

/// Provides the default value for feed.results.
fn default_feed_results() -> u32 {
    60
}

/// Provides the default value for settings_sync.refresh_interval.
fn default_settings_refresh_interval() -> Duration {
    Duration::from_secs(3)
}

/// Configuration for the cloud channel feed the sensor publishes to.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Base URL of the feed service.
    #[serde(default = "default_feed_base_url")]
    pub base_url: Url,

    /// Channel identifier the sensor publishes readings to.
    pub channel_id: String,

    /// Optional read API key for private channels.
    #[serde(default)]
    pub read_api_key: Option<String>,

    /// Number of feed entries to request per poll.
    #[serde(default = "default_feed_results")]
    pub results: u32,
}

/// Configuration for synchronizing thresholds with a remote settings service.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsSyncConfig {
    /// Base URL of the remote settings service. When absent, settings are
    /// managed locally only.
    #[serde(default)]
    pub remote_url: Option<Url>,

    /// The interval in seconds to re-load settings from the remote service.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_settings_refresh_interval"
    )]
    pub refresh_interval: Duration,
}

/// Configuration for the Telegram notification channel.
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramChannelConfig {
    /// The Telegram bot token.
    pub token: String,

    /// Whether to disable web page preview for sent messages.
    #[serde(default)]
    pub disable_web_preview: Option<bool>,
}

/// Configuration for the email notification channel.
///
/// Email is delivered through an HTTP relay endpoint that accepts a JSON
/// body of `{to, from, subject, html}`.
#[derive(Debug, Deserialize, Clone)]
pub struct EmailChannelConfig {
    /// URL of the HTTP email relay endpoint.
    pub relay_url: Url,

    /// The sender address stamped on outgoing alerts.
    pub from_address: String,
}

/// Configuration for the SMS notification channel.
#[derive(Debug, Deserialize, Clone)]
pub struct SmsChannelConfig {
    /// URL of the HTTP SMS gateway endpoint.
    pub gateway_url: Url,
}

/// Per-channel notification transport configuration. A channel with no
/// configuration here cannot deliver even when enabled in the thresholds.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelsConfig {
    /// Telegram bot transport.
    #[serde(default)]
    pub telegram: Option<TelegramChannelConfig>,

    /// Email relay transport.
    #[serde(default)]
    pub email: Option<EmailChannelConfig>,

    /// SMS gateway transport.
    #[serde(default)]
    pub sms: Option<SmsChannelConfig>,
}

/// Application configuration for Undine.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite state store.
    pub database_url: String,

    /// The cloud channel feed to poll for sensor readings.
    pub feed: FeedConfig,

    /// Remote settings synchronization.
    #[serde(default)]
    pub settings_sync: SettingsSyncConfig,

    /// The interval in seconds between alert-check evaluations.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_alert_check_interval"
    )]
    pub alert_check_interval: Duration,

    /// Maximum number of readings retained in the trend window.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Notification channel transports.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Configuration for HTTP client retry policies.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("UNDINE").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            feed: FeedConfig {
                base_url: default_feed_base_url(),
                channel_id: "000000".to_string(),
                read_api_key: None,
                results: default_feed_results(),
            },
            settings_sync: SettingsSyncConfig::default(),
            alert_check_interval: default_alert_check_interval(),
            history_window: default_history_window(),
            channels: ChannelsConfig::default(),
            http_retry_config: HttpRetryConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
            server: ServerConfig::default(),
        }
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn feed_channel(mut self, base_url: Url, channel_id: &str) -> Self {
        self.config.feed.base_url = base_url;
        self.config.feed.channel_id = channel_id.to_string();
        self
    }

    pub fn settings_remote_url(mut self, url: Url) -> Self {
        self.config.settings_sync.remote_url = Some(url);
        self
    }

    pub fn history_window(mut self, capacity: usize) -> Self {
        self.config.history_window = capacity;
        self
    }

    pub fn alert_check_interval(mut self, interval: Duration) -> Self {
        self.config.alert_check_interval = interval;
        self
    }

    pub fn telegram(mut self, token: &str) -> Self {
        self.config.channels.telegram =
            Some(TelegramChannelConfig { token: token.to_string(), disable_web_preview: None });
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_builder() {
        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .feed_channel(Url::parse("http://localhost:9999").unwrap(), "12345")
            .history_window(10)
            .build();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.feed.channel_id, "12345");
        assert_eq!(config.history_window, 10);
        assert!(config.channels.telegram.is_none());
    }

    #[test]
    fn test_app_config_from_file() {
        let config_content = r#"
        database_url: "sqlite:undine.db"
        feed:
          channel_id: "2418910"
          read_api_key: "ABCDEF123456"
        channels:
          telegram:
            token: "123456789:TESTTOKENTESTTOKENTESTTOKENTESTTOKEN"
        "#;
        let temp_dir = tempfile::tempdir().unwrap();
        let app_yaml_path = temp_dir.path().join("app.yaml");
        std::fs::write(&app_yaml_path, config_content).unwrap();

        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();

        assert_eq!(config.database_url, "sqlite:undine.db");
        assert_eq!(config.feed.channel_id, "2418910");
        assert_eq!(config.feed.base_url, default_feed_base_url());
        assert_eq!(config.feed.results, 60);
        assert_eq!(config.alert_check_interval, Duration::from_secs(60));
        assert_eq!(config.settings_sync.refresh_interval, Duration::from_secs(3));
        assert_eq!(config.history_window, 40);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.settings_sync.remote_url.is_none());
        assert!(config.channels.telegram.is_some());
        assert!(config.channels.email.is_none());
    }

    #[test]
    fn test_app_config_custom_intervals() {
        let config_content = r#"
        database_url: "sqlite::memory:"
        feed:
          channel_id: "1"
        settings_sync:
          remote_url: "https://settings.example.com/api/v1"
          refresh_interval: 5
        alert_check_interval: 120
        history_window: 80
        "#;
        let temp_dir = tempfile::tempdir().unwrap();
        let app_yaml_path = temp_dir.path().join("app.yaml");
        std::fs::write(&app_yaml_path, config_content).unwrap();

        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();

        assert_eq!(config.settings_sync.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.alert_check_interval, Duration::from_secs(120));
        assert_eq!(config.history_window, 80);
        assert_eq!(
            config.settings_sync.remote_url.unwrap().to_string(),
            "https://settings.example.com/api/v1"
        );
    }
}
