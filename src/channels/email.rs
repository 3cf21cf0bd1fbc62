//! Email transport through an HTTP relay.
//!
//! The relay accepts a JSON body of `{to, from, subject, html}` and hands
//! the message to the actual mail provider, keeping the daemon's outbound
//! surface HTTP-only like every other transport.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use url::Url;

use super::{error::ChannelError, traits::ChannelNotifier};
use crate::{
    config::EmailChannelConfig,
    models::{Channel, NotificationMessage, Recipient},
};

/// Delivers notifications as HTML email through the relay endpoint.
pub struct EmailNotifier {
    relay_url: Url,
    from_address: String,
    client: Arc<ClientWithMiddleware>,
}

impl EmailNotifier {
    /// Creates a notifier for the configured relay.
    pub fn new(config: &EmailChannelConfig, client: Arc<ClientWithMiddleware>) -> Self {
        Self {
            relay_url: config.relay_url.clone(),
            from_address: config.from_address.clone(),
            client,
        }
    }
}

#[async_trait]
impl ChannelNotifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn notify(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        let to = recipient
            .address_for(Channel::Email)
            .ok_or(ChannelError::MissingAddress(Channel::Email))?;

        let payload = json!({
            "to": to,
            "from": self.from_address,
            "subject": message.title,
            "html": message.body,
        });

        let response = self.client.post(self.relay_url.clone()).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status { channel: Channel::Email, status });
        }

        tracing::debug!(to, "Email alert delivered.");
        Ok(())
    }
}
