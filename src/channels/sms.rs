//! SMS transport through an HTTP gateway.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use url::Url;

use super::{error::ChannelError, traits::ChannelNotifier};
use crate::{
    config::SmsChannelConfig,
    models::{Channel, NotificationMessage, Recipient},
};

/// Delivers notifications as plain text through the SMS gateway.
pub struct SmsNotifier {
    gateway_url: Url,
    client: Arc<ClientWithMiddleware>,
}

impl SmsNotifier {
    /// Creates a notifier for the configured gateway.
    pub fn new(config: &SmsChannelConfig, client: Arc<ClientWithMiddleware>) -> Self {
        Self { gateway_url: config.gateway_url.clone(), client }
    }
}

#[async_trait]
impl ChannelNotifier for SmsNotifier {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn notify(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        let to = recipient
            .address_for(Channel::Sms)
            .ok_or(ChannelError::MissingAddress(Channel::Sms))?;

        let payload = json!({
            "to": to,
            "text": format!("{}\n{}", message.title, message.body),
        });

        let response = self.client.post(self.gateway_url.clone()).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status { channel: Channel::Sms, status });
        }

        tracing::debug!(to, "SMS alert delivered.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HttpRetryConfig, http_client::create_retryable_http_client,
        test_helpers::RecipientBuilder,
    };

    #[tokio::test]
    async fn test_recipient_without_phone_is_rejected() {
        let config =
            SmsChannelConfig { gateway_url: Url::parse("https://sms.example.com/send").unwrap() };
        let client = Arc::new(create_retryable_http_client(
            &HttpRetryConfig::default(),
            reqwest::Client::new(),
        ));
        let notifier = SmsNotifier::new(&config, client);

        let recipient = RecipientBuilder::new(1, "No Phone").telegram_chat_id("42").build();
        let message = NotificationMessage { title: "t".to_string(), body: "b".to_string() };

        let result = notifier.notify(&recipient, &message).await;

        assert!(matches!(result, Err(ChannelError::MissingAddress(Channel::Sms))));
    }
}
