//! Chat message types

use serde::{Deserialize, Serialize};

/// Sender name used when a message does not carry one
pub const ANONYMOUS: &str = "anonymous";

/// A message as sent by a participant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundChat {
    /// Declared sender name
    #[serde(default)]
    pub from: Option<String>,

    /// Message body
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundChat {
    /// Message with both fields set
    pub fn new(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            text: Some(text.into()),
        }
    }
}

/// A message as relayed to participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub text: String,
    /// Server receive time in epoch milliseconds
    pub ts: i64,
}

impl ChatMessage {
    /// Stamp an inbound message with the server time
    pub fn stamp(inbound: InboundChat) -> Self {
        let from = inbound
            .from
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());

        Self {
            from,
            text: inbound.text.unwrap_or_default(),
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}
