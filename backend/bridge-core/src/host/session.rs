//! One authenticated webview connection, as seen by handlers.

use crate::error::HostError;
use crate::protocol::{
    IncomingMessage, MessageKind, OutgoingMessage, PING_MESSAGE_TYPE, encode_payload,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound side of a webview session.
///
/// Frames are queued to the connection's writer task, so sending never
/// blocks a handler. Cloning shares the queue and the pong counter.
#[derive(Clone, Debug)]
pub struct HostSession {
    id: Uuid,
    outbound: mpsc::UnboundedSender<String>,
    pongs: Arc<AtomicU64>,
}

impl HostSession {
    /// Session writing JSON frames into `outbound`.
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            pongs: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a host → webview message.
    pub fn send(&self, message: &IncomingMessage) -> Result<(), HostError> {
        let frame = serde_json::to_string(message).map_err(|e| {
            HostError::send(format!("Failed to encode {}: {e}", message.message_type))
        })?;

        self.outbound
            .send(frame)
            .map_err(|_| HostError::send(format!("Session {} is closed", self.id)))
    }

    /// Answer `request` with `payload`, reusing the request's `messageId`.
    pub fn reply<M>(&self, request: &OutgoingMessage, payload: &M) -> Result<(), HostError>
    where
        M: MessageKind + Serialize,
    {
        let data = encode_payload(payload)?.unwrap_or(Value::Null);
        self.send(&IncomingMessage::reply_to(request, M::MESSAGE_TYPE, data))
    }

    /// Empty acknowledgement of `request`, typed as the request itself.
    pub fn acknowledge(&self, request: &OutgoingMessage) -> Result<(), HostError> {
        self.send(&IncomingMessage::reply_to(
            request,
            request.message_type.clone(),
            Value::Null,
        ))
    }

    /// Host-initiated message with no correlation id.
    pub fn push<M>(&self, payload: &M) -> Result<(), HostError>
    where
        M: MessageKind + Serialize,
    {
        let data = encode_payload(payload)?.unwrap_or(Value::Null);
        self.send(&IncomingMessage::broadcast(M::MESSAGE_TYPE, data))
    }

    pub fn ping(&self) -> Result<(), HostError> {
        self.send(&IncomingMessage::broadcast(PING_MESSAGE_TYPE, Value::Null))
    }

    pub fn pongs_received(&self) -> u64 {
        self.pongs.load(Ordering::Relaxed)
    }

    pub(crate) fn record_pong(&self) {
        self.pongs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
