//! # Notification Channels
//!
//! This module is responsible for delivering rendered alert messages
//! through the configured transports. Each transport implements the
//! [`ChannelNotifier`] trait, so the dispatcher can fan out over an
//! arbitrary set of channels polymorphically.
//!
//! ## Core Components
//!
//! - **`ChannelNotifier` Trait**: A generic interface for all notification
//!   channels, keyed by the [`Channel`] a recipient subscribed to.
//! - **Transports**: `TelegramNotifier` (Bot API), `EmailNotifier` (HTTP
//!   relay) and `SmsNotifier` (HTTP gateway), each over a pooled retrying
//!   HTTP client.
//! - **`TemplateService`**: renders alert title/body templates with the
//!   current reading and threshold values.

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::{ChannelsConfig, HttpRetryConfig},
    http_client::HttpClientPool,
    models::Channel,
};

mod email;
mod error;
mod sms;
mod telegram;
mod template;
mod traits;

pub use email::EmailNotifier;
pub use error::ChannelError;
pub use sms::SmsNotifier;
pub use telegram::TelegramNotifier;
pub use template::{TemplateService, TemplateServiceError};
pub use traits::ChannelNotifier;

/// Builds one notifier per configured transport.
///
/// A channel missing from the configuration is simply absent from the map;
/// enabling it in the thresholds then has no effect, which the dispatcher
/// logs at fan-out time.
pub async fn build_channel_notifiers(
    channels: &ChannelsConfig,
    retry_policy: &HttpRetryConfig,
    client_pool: &HttpClientPool,
) -> Result<HashMap<Channel, Arc<dyn ChannelNotifier>>, ChannelError> {
    let mut notifiers: HashMap<Channel, Arc<dyn ChannelNotifier>> = HashMap::new();

    if let Some(config) = &channels.telegram {
        let client = client_pool.get_or_create(retry_policy).await?;
        notifiers.insert(Channel::Telegram, Arc::new(TelegramNotifier::new(config, client)?));
    }
    if let Some(config) = &channels.email {
        let client = client_pool.get_or_create(retry_policy).await?;
        notifiers.insert(Channel::Email, Arc::new(EmailNotifier::new(config, client)));
    }
    if let Some(config) = &channels.sms {
        let client = client_pool.get_or_create(retry_policy).await?;
        notifiers.insert(Channel::Sms, Arc::new(SmsNotifier::new(config, client)));
    }

    tracing::info!(configured = notifiers.len(), "Notification channels initialized.");
    Ok(notifiers)
}
