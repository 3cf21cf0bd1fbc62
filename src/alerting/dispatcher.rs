//! Multi-channel alert dispatch.
//!
//! The dispatcher fans a rendered message out to every active recipient
//! over the intersection of the enabled channels and the recipient's
//! subscriptions. Per recipient-channel attempts are isolated: one failed
//! delivery never blocks the rest, and the aggregate outcome is reported
//! back to the caller instead of thrown.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;

use crate::{
    channels::{ChannelNotifier, TemplateService},
    models::{AlertEvent, Channel, DeliveryReport, NotificationMessage, Reading, ThresholdConfig},
    persistence::traits::KeyValueStore,
    recipients::{RecipientRegistry, RegistryError},
};

use super::messages::render_alert_message;

/// The aggregate outcome of one fan-out.
#[derive(Debug, Clone)]
pub struct FanOutOutcome {
    /// Delivery counts.
    pub report: DeliveryReport,
    /// Names of recipients with at least one successful delivery.
    pub recipients_notified: Vec<String>,
    /// Channels that carried at least one successful delivery.
    pub channels_used: Vec<Channel>,
    /// The message that went out.
    pub message: NotificationMessage,
}

/// The response of a manual test alert.
#[derive(Debug, Clone)]
pub struct TestAlertOutcome {
    /// Delivery counts.
    pub report: DeliveryReport,
    /// The Telegram bot identity, when that channel is configured and live.
    pub bot_username: Option<String>,
}

impl Default for FanOutOutcome {
    fn default() -> Self {
        Self {
            report: DeliveryReport::default(),
            recipients_notified: Vec::new(),
            channels_used: Vec::new(),
            message: NotificationMessage { title: String::new(), body: String::new() },
        }
    }
}

/// Fans rendered alerts out to the recipient set.
pub struct AlertDispatcher<T: KeyValueStore> {
    notifiers: HashMap<Channel, Arc<dyn ChannelNotifier>>,
    registry: Arc<RecipientRegistry<T>>,
    templates: TemplateService,
}

impl<T: KeyValueStore> AlertDispatcher<T> {
    /// Creates a dispatcher over the configured channel transports.
    pub fn new(
        notifiers: HashMap<Channel, Arc<dyn ChannelNotifier>>,
        registry: Arc<RecipientRegistry<T>>,
    ) -> Self {
        Self { notifiers, registry, templates: TemplateService::new() }
    }

    /// Renders and dispatches the notification for an active alert
    /// condition.
    pub async fn dispatch_event(
        &self,
        event: &AlertEvent,
        reading: &Reading,
        config: &ThresholdConfig,
    ) -> Result<FanOutOutcome, RegistryError> {
        let message = render_alert_message(&self.templates, event, reading);
        self.fan_out(message, config).await
    }

    /// Sends a manual test alert, bypassing the cooldown gate entirely.
    /// Idempotent and repeatable on demand.
    pub async fn send_test(
        &self,
        text: Option<String>,
        config: &ThresholdConfig,
    ) -> Result<(TestAlertOutcome, FanOutOutcome), RegistryError> {
        let message = NotificationMessage {
            title: "🧪 Test Alert".to_string(),
            body: text.unwrap_or_else(|| {
                format!(
                    "This is a test message to verify the alert system.\n\n\
                     <i>Sent at {} UTC</i>",
                    Utc::now().format("%Y-%m-%d %H:%M:%S")
                )
            }),
        };

        let outcome = self.fan_out(message, config).await?;
        let test_outcome =
            TestAlertOutcome { report: outcome.report, bot_username: self.bot_username().await };
        Ok((test_outcome, outcome))
    }

    /// The Telegram bot identity, when configured.
    pub async fn bot_username(&self) -> Option<String> {
        self.notifiers.get(&Channel::Telegram)?.identity().await
    }

    /// Whether the Telegram transport is configured.
    pub fn telegram_configured(&self) -> bool {
        self.notifiers.contains_key(&Channel::Telegram)
    }

    /// Delivers `message` to every active recipient over the channels in
    /// `enabled_channels ∩ recipient.channels`.
    ///
    /// The registry is read fresh here, so recipient mutations are visible
    /// to the very next dispatch cycle.
    async fn fan_out(
        &self,
        message: NotificationMessage,
        config: &ThresholdConfig,
    ) -> Result<FanOutOutcome, RegistryError> {
        let recipients = self.registry.list_active().await?;

        let mut outcome = FanOutOutcome::default();
        outcome.report.recipients_total = recipients.len();

        if recipients.is_empty() {
            tracing::warn!("No active recipients configured for alerts.");
            outcome.message = message;
            return Ok(outcome);
        }

        for recipient in &recipients {
            let mut reached = false;
            for channel in config.enabled_channels.iter().filter(|c| recipient.channels.contains(c))
            {
                let Some(notifier) = self.notifiers.get(channel) else {
                    tracing::warn!(channel = %channel, "Channel enabled but no transport configured.");
                    outcome.report.record(false);
                    continue;
                };
                match notifier.notify(recipient, &message).await {
                    Ok(()) => {
                        outcome.report.record(true);
                        reached = true;
                        if !outcome.channels_used.contains(channel) {
                            outcome.channels_used.push(*channel);
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            recipient = %recipient.name,
                            channel = %channel,
                            "Delivery failed; continuing with remaining recipients."
                        );
                        outcome.report.record(false);
                    }
                }
            }
            if reached {
                outcome.recipients_notified.push(recipient.name.clone());
            }
        }

        tracing::info!(
            sent = outcome.report.sent_successfully,
            failed = outcome.report.failed,
            recipients = outcome.report.recipients_total,
            "Alert fan-out complete."
        );
        outcome.message = message;
        Ok(outcome)
    }
}
