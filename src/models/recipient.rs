//! Notification recipients and their channel subscriptions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A notification transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Telegram bot message.
    Telegram,
    /// Email through the HTTP relay.
    Email,
    /// SMS through the HTTP gateway.
    Sms,
}

impl Channel {
    /// Stable lowercase name used in logs and state keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Telegram => "telegram",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role of a recipient in the operator UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May manage recipients and settings.
    Admin,
    /// Receives alerts only.
    #[default]
    Viewer,
}

/// A notification target.
///
/// Deactivated recipients keep their configuration and are skipped at
/// fan-out; deletion is a separate, explicit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Registry-assigned identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Telegram chat id, required for a telegram subscription.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    /// Email address, required for an email subscription.
    #[serde(default)]
    pub email: Option<String>,
    /// E.164 phone number, required for an sms subscription.
    #[serde(default)]
    pub phone: Option<String>,
    /// Operator role.
    #[serde(default)]
    pub role: Role,
    /// Whether this recipient participates in fan-out.
    pub is_active: bool,
    /// Channels this recipient subscribed to.
    pub channels: BTreeSet<Channel>,
    /// When the recipient was registered.
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    /// The address this recipient uses on the given channel, if configured.
    pub fn address_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Telegram => self.telegram_chat_id.as_deref(),
            Channel::Email => self.email.as_deref(),
            Channel::Sms => self.phone.as_deref(),
        }
    }
}

/// The payload for registering a new recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientSpec {
    /// Display name, required.
    pub name: String,
    /// Telegram chat id.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number, `+`-prefixed E.164.
    #[serde(default)]
    pub phone: Option<String>,
    /// Operator role.
    #[serde(default)]
    pub role: Role,
    /// Subscribed channels; at least one is required.
    #[serde(default)]
    pub channels: BTreeSet<Channel>,
}

impl RecipientSpec {
    /// Validates the spec shape: a name, at least one channel, an address
    /// for every subscribed channel and an E.164 phone when one is given.
    pub fn validate(&self) -> Result<(), RecipientValidationError> {
        if self.name.trim().is_empty() {
            return Err(RecipientValidationError::EmptyName);
        }
        if self.channels.is_empty() {
            return Err(RecipientValidationError::NoChannels);
        }
        for channel in &self.channels {
            let address = match channel {
                Channel::Telegram => &self.telegram_chat_id,
                Channel::Email => &self.email,
                Channel::Sms => &self.phone,
            };
            if address.as_deref().is_none_or(|a| a.trim().is_empty()) {
                return Err(RecipientValidationError::MissingChannelAddress(*channel));
            }
        }
        if let Some(phone) = self.phone.as_deref() {
            if !phone.trim().starts_with('+') {
                return Err(RecipientValidationError::InvalidPhone(phone.to_string()));
            }
        }
        Ok(())
    }
}

/// Errors rejecting an invalid recipient registration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecipientValidationError {
    /// The display name is required.
    #[error("Recipient name cannot be empty.")]
    EmptyName,

    /// At least one channel subscription is required.
    #[error("Recipient must subscribe to at least one channel.")]
    NoChannels,

    /// A subscribed channel has no corresponding address.
    #[error("Missing address for subscribed channel '{0}'.")]
    MissingChannelAddress(Channel),

    /// Phone numbers must be in international E.164 form.
    #[error("Phone number '{0}' must start with '+' (E.164).")]
    InvalidPhone(String),

    /// Another recipient already registered this phone number.
    #[error("Phone number '{0}' is already registered.")]
    DuplicatePhone(String),
}
