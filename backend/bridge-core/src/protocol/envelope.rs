use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Correlation id of a webview request.
///
/// Freshly generated (UUID v4) for every outgoing message; never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-side handler a webview message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Creator,
    Settings,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Creator => f.write_str("creator"),
            Destination::Settings => f.write_str("settings"),
        }
    }
}

/// Webview → host envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub message_id: MessageId,
    pub destination: Destination,
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl OutgoingMessage {
    /// Build an envelope with a fresh id.
    pub fn new(
        destination: Destination,
        message_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        Self {
            message_id: MessageId::generate(),
            destination,
            message_type: message_type.into(),
            payload,
        }
    }
}

/// Host → webview envelope.
///
/// `payload` is accepted as an alias of `data`: host-initiated pushes such as
/// `tab` are sent with a `payload` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub message_type: String,
    #[serde(default, alias = "payload")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

impl IncomingMessage {
    /// Host-initiated message with no correlation id.
    pub fn broadcast(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
            message_id: None,
        }
    }

    /// Reply correlated with `request`.
    pub fn reply_to(request: &OutgoingMessage, message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
            message_id: Some(request.message_id.clone()),
        }
    }
}
