//! The common interface every notification transport implements.

use async_trait::async_trait;

use crate::models::{Channel, NotificationMessage, Recipient};

use super::error::ChannelError;

/// A notification transport capable of delivering a message to a recipient.
#[async_trait]
pub trait ChannelNotifier: Send + Sync {
    /// The channel this transport serves.
    fn channel(&self) -> Channel;

    /// Delivers the message to the recipient's address on this channel.
    async fn notify(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError>;

    /// A human-readable transport identity (e.g. the bot username),
    /// surfaced in the alert status endpoint.
    async fn identity(&self) -> Option<String> {
        None
    }
}
