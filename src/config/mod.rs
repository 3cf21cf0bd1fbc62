//! Configuration module for Undine.

mod app_config;
mod helpers;
mod http_retry;
mod server;

pub use app_config::{
    AppConfig, ChannelsConfig, EmailChannelConfig, FeedConfig, SettingsSyncConfig,
    SmsChannelConfig, TelegramChannelConfig,
};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use server::ServerConfig;
