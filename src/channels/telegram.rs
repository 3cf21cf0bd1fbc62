//! Telegram Bot API transport.
//!
//! Messages go out as HTML-formatted `sendMessage` calls; the bot identity
//! is resolved through `getMe` for the alert status endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{error::ChannelError, traits::ChannelNotifier};
use crate::{
    config::TelegramChannelConfig,
    models::{Channel, NotificationMessage, Recipient},
};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// The `getMe` response envelope.
#[derive(Debug, Deserialize)]
struct GetMeResponse {
    ok: bool,
    #[serde(default)]
    result: Option<BotInfo>,
}

#[derive(Debug, Deserialize)]
struct BotInfo {
    username: String,
}

/// Builds the `sendMessage` payload for a chat.
fn build_payload(
    chat_id: &str,
    message: &NotificationMessage,
    disable_web_preview: bool,
) -> serde_json::Value {
    json!({
        "chat_id": chat_id,
        "text": format!("<b>{}</b>\n\n{}", message.title, message.body),
        "parse_mode": "HTML",
        "disable_web_page_preview": disable_web_preview,
    })
}

/// Delivers notifications through a Telegram bot.
pub struct TelegramNotifier {
    send_message_url: Url,
    get_me_url: Url,
    disable_web_preview: bool,
    client: Arc<ClientWithMiddleware>,
}

impl TelegramNotifier {
    /// Creates a notifier for the configured bot token.
    pub fn new(
        config: &TelegramChannelConfig,
        client: Arc<ClientWithMiddleware>,
    ) -> Result<Self, ChannelError> {
        if config.token.is_empty() {
            return Err(ChannelError::Config("Telegram token cannot be empty".to_string()));
        }
        let send_message_url =
            Url::parse(&format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", config.token))
                .map_err(|e| ChannelError::Config(e.to_string()))?;
        let get_me_url = Url::parse(&format!("{TELEGRAM_API_BASE}/bot{}/getMe", config.token))
            .map_err(|e| ChannelError::Config(e.to_string()))?;

        Ok(Self {
            send_message_url,
            get_me_url,
            disable_web_preview: config.disable_web_preview.unwrap_or(false),
            client,
        })
    }

    /// Overrides the API base, so tests can point the notifier at a mock
    /// server.
    #[doc(hidden)]
    pub fn with_api_base(mut self, base: &Url, token: &str) -> Result<Self, ChannelError> {
        let base = base.as_str().trim_end_matches('/');
        self.send_message_url = Url::parse(&format!("{base}/bot{token}/sendMessage"))
            .map_err(|e| ChannelError::Config(e.to_string()))?;
        self.get_me_url = Url::parse(&format!("{base}/bot{token}/getMe"))
            .map_err(|e| ChannelError::Config(e.to_string()))?;
        Ok(self)
    }

    /// Resolves the bot's username, if the token is live. Failures are
    /// logged and read as "not configured" rather than errors.
    pub async fn bot_username(&self) -> Option<String> {
        let response = match self.client.get(self.get_me_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query Telegram bot identity.");
                return None;
            }
        };
        match response.json::<GetMeResponse>().await {
            Ok(body) if body.ok => body.result.map(|bot| bot.username),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode Telegram getMe response.");
                None
            }
        }
    }
}

#[async_trait]
impl ChannelNotifier for TelegramNotifier {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn notify(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        let chat_id = recipient
            .address_for(Channel::Telegram)
            .ok_or(ChannelError::MissingAddress(Channel::Telegram))?;

        let payload = build_payload(chat_id, message, self.disable_web_preview);
        let response =
            self.client.post(self.send_message_url.clone()).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status { channel: Channel::Telegram, status });
        }

        tracing::debug!(chat_id = &chat_id[..chat_id.len().min(4)], "Telegram alert delivered.");
        Ok(())
    }

    async fn identity(&self) -> Option<String> {
        self.bot_username().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let message = NotificationMessage {
            title: "WATER QUALITY ALERT".to_string(),
            body: "TDS: <code>152.00 ppm</code>".to_string(),
        };

        let payload = build_payload("1362954575", &message, true);

        assert_eq!(payload["chat_id"], "1362954575");
        assert_eq!(payload["parse_mode"], "HTML");
        assert_eq!(payload["disable_web_page_preview"], true);
        let text = payload["text"].as_str().unwrap();
        assert!(text.starts_with("<b>WATER QUALITY ALERT</b>"));
        assert!(text.contains("152.00 ppm"));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let config =
            TelegramChannelConfig { token: String::new(), disable_web_preview: None };
        let client = Arc::new(crate::http_client::create_retryable_http_client(
            &crate::config::HttpRetryConfig::default(),
            reqwest::Client::new(),
        ));

        assert!(matches!(
            TelegramNotifier::new(&config, client),
            Err(ChannelError::Config(_))
        ));
    }
}
