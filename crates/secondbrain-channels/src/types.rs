//! Wire-neutral message envelopes shared by every transport adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    PlainText,
    Markdown,
    Html,
}

impl Default for MessageFormat {
    fn default() -> Self {
        MessageFormat::PlainText
    }
}

/// A message received from a transport, before any entity extraction or
/// processing happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub raw_payload: Option<Value>,
}

/// A message ready to be handed to a `Channel::send` implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub recipient_id: String,
    pub content: String,
    pub format: MessageFormat,
}

impl OutboundMessage {
    pub fn plain(channel: impl Into<String>, recipient_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            recipient_id: recipient_id.into(),
            content: content.into(),
            format: MessageFormat::PlainText,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
