//! Wire shapes exchanged across the webview/host boundary.
//!
//! Two envelopes cross the boundary, both as camelCase JSON:
//!
//! - [`OutgoingMessage`] - webview → host, always tagged with a fresh
//!   [`MessageId`] and a [`Destination`]
//! - [`IncomingMessage`] - host → webview; carries a `messageId` only when it
//!   answers a request
//!
//! The [`catalog`] module binds each known `messageType` to a typed payload.

pub mod catalog;
mod envelope;

pub use catalog::MessageKind;
pub use envelope::{Destination, IncomingMessage, MessageId, OutgoingMessage};

use crate::error::ProtocolError;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Built-in keep-alive request sent by the host.
pub const PING_MESSAGE_TYPE: &str = "ping";

/// Automatic reply to [`PING_MESSAGE_TYPE`].
pub const PONG_MESSAGE_TYPE: &str = "pong";

/// Encode a typed payload. Unit payloads encode to `None` so they are omitted
/// from the envelope.
pub fn encode_payload<M>(message: &M) -> Result<Option<Value>, ProtocolError>
where
    M: MessageKind + Serialize,
{
    match serde_json::to_value(message) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ProtocolError::encode(M::MESSAGE_TYPE, &e)),
    }
}

/// Decode a typed payload, treating an absent payload as JSON `null`.
pub fn decode_payload<M>(message_type: &str, payload: Option<&Value>) -> Result<M, ProtocolError>
where
    M: DeserializeOwned,
{
    let value = payload.cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| ProtocolError::payload(message_type, &e))
}
