//! A set of helpers for testing

use std::{
    collections::BTreeSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    channels::{ChannelError, ChannelNotifier},
    models::{Channel, NotificationMessage, Reading, Recipient, Role},
};

/// A builder for creating [`Reading`] instances for testing.
#[derive(Debug, Clone)]
pub struct ReadingBuilder {
    voltage: f64,
    tds: f64,
    temperature: f64,
    timestamp: DateTime<Utc>,
}

impl Default for ReadingBuilder {
    fn default() -> Self {
        Self {
            voltage: 3.3,
            tds: 120.0,
            temperature: 25.0,
            timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
        }
    }
}

impl ReadingBuilder {
    /// Creates a new `ReadingBuilder` with nominal values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TDS value.
    pub fn tds(mut self, tds: f64) -> Self {
        self.tds = tds;
        self
    }

    /// Sets the temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the voltage.
    pub fn voltage(mut self, voltage: f64) -> Self {
        self.voltage = voltage;
        self
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builds the [`Reading`].
    pub fn build(self) -> Reading {
        Reading {
            voltage: self.voltage,
            tds: self.tds,
            temperature: self.temperature,
            timestamp: self.timestamp,
        }
    }
}

/// A builder for creating [`Recipient`] instances for testing.
#[derive(Debug, Clone)]
pub struct RecipientBuilder {
    id: u64,
    name: String,
    telegram_chat_id: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    active: bool,
    channels: BTreeSet<Channel>,
}

impl RecipientBuilder {
    /// Creates a new `RecipientBuilder`.
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            telegram_chat_id: None,
            email: None,
            phone: None,
            active: true,
            channels: BTreeSet::new(),
        }
    }

    /// Sets the telegram chat id and subscribes the telegram channel.
    pub fn telegram_chat_id(mut self, chat_id: &str) -> Self {
        self.telegram_chat_id = Some(chat_id.to_string());
        self.channels.insert(Channel::Telegram);
        self
    }

    /// Sets the email address and subscribes the email channel.
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self.channels.insert(Channel::Email);
        self
    }

    /// Sets the phone number and subscribes the sms channel.
    pub fn phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self.channels.insert(Channel::Sms);
        self
    }

    /// Marks the recipient inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Builds the [`Recipient`].
    pub fn build(self) -> Recipient {
        Recipient {
            id: self.id,
            name: self.name,
            telegram_chat_id: self.telegram_chat_id,
            email: self.email,
            phone: self.phone,
            role: Role::Viewer,
            is_active: self.active,
            channels: self.channels,
            created_at: Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap(),
        }
    }
}

/// A [`ChannelNotifier`] that records deliveries instead of performing them.
///
/// Set `failures_remaining` to make the first N deliveries fail, for
/// exercising failure isolation in fan-out.
pub struct RecordingNotifier {
    channel: Channel,
    failures_remaining: AtomicUsize,
    deliveries: Mutex<Vec<(u64, String)>>,
}

impl RecordingNotifier {
    /// Creates a notifier for the given channel that always succeeds.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            failures_remaining: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Makes the first `n` deliveries fail.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// The recorded `(recipient id, message title)` deliveries.
    pub fn deliveries(&self) -> Vec<(u64, String)> {
        self.deliveries.lock().expect("deliveries lock poisoned").clone()
    }
}

#[async_trait]
impl ChannelNotifier for RecordingNotifier {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn notify(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChannelError::Status {
                channel: self.channel,
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        self.deliveries
            .lock()
            .expect("deliveries lock poisoned")
            .push((recipient.id, message.title.clone()));
        Ok(())
    }
}
