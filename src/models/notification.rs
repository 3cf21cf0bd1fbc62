//! The rendered content of an outbound notification.

use serde::{Deserialize, Serialize};

/// A notification message with a title and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// The title of the notification.
    pub title: String,
    /// The body of the notification. May contain HTML formatting for
    /// channels that render it (Telegram, email); the SMS channel strips
    /// nothing and sends the text as-is.
    pub body: String,
}
