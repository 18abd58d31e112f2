//! Webview-side messenger: request/response correlation plus type listeners.
//!
//! # Architecture
//!
//! One [`Messenger`] owns two independent subscriber sets:
//!
//! - **Pending responses** - requests sent with `wait_for_response`, keyed by
//!   [`MessageId`], resolved by the first inbound message carrying that id or
//!   failed after the response timeout
//! - **Listeners** - callbacks keyed by `messageType`, invoked in
//!   registration order
//!
//! Every inbound message is checked against pending responses first and then
//! fanned out to listeners. Both paths fire for the same message: a reply to
//! `getPearAuth` also reaches anyone listening for `getPearAuth`.
//!
//! The built-in `ping` type is answered with a fire-and-forget `pong` and is
//! not delivered to listeners.
//!
//! # Thread Safety
//!
//! `Messenger` is `Clone`; all clones share the same maps.

mod listeners;
mod pending;

pub use listeners::{Listener, ListenerId, Subscription};

use crate::config::{MessagingConfig, UnavailableTransportPolicy};
use crate::error::{MessengerError, ProtocolError, TransportError};
use crate::messenger::listeners::ListenerRegistry;
use crate::messenger::pending::PendingResponses;
use crate::protocol::{
    Destination, IncomingMessage, MessageId, MessageKind, OutgoingMessage, PING_MESSAGE_TYPE,
    PONG_MESSAGE_TYPE, decode_payload, encode_payload,
};
use crate::transport::HostTransport;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

struct MessengerInner {
    destination: Destination,
    transport: Arc<dyn HostTransport>,
    pending: Arc<PendingResponses>,
    listeners: Arc<ListenerRegistry>,
    response_timeout: Duration,
    unavailable_policy: UnavailableTransportPolicy,
}

/// Correlating messenger bound to one destination and one host transport.
#[derive(Clone)]
pub struct Messenger {
    inner: Arc<MessengerInner>,
}

impl Messenger {
    pub fn new(
        destination: Destination,
        transport: Arc<dyn HostTransport>,
        config: &MessagingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(MessengerInner {
                destination,
                transport,
                pending: Arc::new(PendingResponses::default()),
                listeners: Arc::new(ListenerRegistry::default()),
                response_timeout: config.response_timeout(),
                unavailable_policy: config.unavailable_transport,
            }),
        }
    }

    /// Messenger with the default 10 second timeout and `ignore` policy.
    pub fn with_defaults(destination: Destination, transport: Arc<dyn HostTransport>) -> Self {
        Self::new(destination, transport, &MessagingConfig::default())
    }

    pub fn destination(&self) -> Destination {
        self.inner.destination
    }

    pub fn response_timeout(&self) -> Duration {
        self.inner.response_timeout
    }

    // ------------------------------------------------------------------ //
    // Sending
    // ------------------------------------------------------------------ //

    /// Send `message_type` to the host.
    ///
    /// With `wait_for_response == false` this returns `Ok(None)` as soon as the
    /// message is posted. Otherwise it resolves with the first inbound message
    /// carrying the same `messageId`.
    ///
    /// # Errors
    ///
    /// - [`MessengerError::Timeout`] - no correlated reply within the response timeout
    /// - [`MessengerError::Transport`] - the post failed (unavailable transport
    ///   only under [`UnavailableTransportPolicy::Fail`])
    pub async fn send(
        &self,
        message_type: &str,
        payload: Option<Value>,
        wait_for_response: bool,
    ) -> Result<Option<IncomingMessage>, MessengerError> {
        if !wait_for_response {
            self.post(message_type, payload)?;
            return Ok(None);
        }

        self.request(message_type, payload).await.map(Some)
    }

    /// Fire-and-forget send. Returns the id the message was tagged with.
    pub fn post(&self, message_type: &str, payload: Option<Value>) -> Result<MessageId, MessengerError> {
        let message = OutgoingMessage::new(self.inner.destination, message_type, payload);
        self.dispatch(&message)?;
        Ok(message.message_id)
    }

    /// Send and wait for the correlated reply.
    pub async fn request(
        &self,
        message_type: &str,
        payload: Option<Value>,
    ) -> Result<IncomingMessage, MessengerError> {
        let message = OutgoingMessage::new(self.inner.destination, message_type, payload);

        // Track before posting: an in-process host may answer synchronously.
        let pending = self
            .inner
            .pending
            .track(message.message_id.clone(), message_type);

        self.dispatch(&message)?;

        pending.wait(self.inner.response_timeout).await
    }

    /// Typed [`send`](Self::send).
    pub async fn send_typed<M>(
        &self,
        message: &M,
        wait_for_response: bool,
    ) -> Result<Option<IncomingMessage>, MessengerError>
    where
        M: MessageKind + Serialize,
    {
        let payload = encode_payload(message)?;
        self.send(M::MESSAGE_TYPE, payload, wait_for_response).await
    }

    /// Typed [`request`](Self::request); decodes the reply's `data` as `R`.
    pub async fn request_typed<M, R>(&self, message: &M) -> Result<R, MessengerError>
    where
        M: MessageKind + Serialize,
        R: DeserializeOwned,
    {
        let payload = encode_payload(message)?;
        let reply = self.request(M::MESSAGE_TYPE, payload).await?;
        let decoded = decode_payload(&reply.message_type, Some(&reply.data))?;
        Ok(decoded)
    }

    fn dispatch(&self, message: &OutgoingMessage) -> Result<(), MessengerError> {
        match self.inner.transport.post(message) {
            Ok(()) => {
                debug!(
                    "Posted {} ({}) to {}",
                    message.message_type, message.message_id, message.destination
                );
                Ok(())
            }
            Err(e @ TransportError::Unavailable { .. }) => match self.inner.unavailable_policy {
                UnavailableTransportPolicy::Ignore => {
                    warn!("Dropped {} - host transport unavailable: {}", message.message_type, e);
                    Ok(())
                }
                UnavailableTransportPolicy::Fail => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------ //
    // Receiving
    // ------------------------------------------------------------------ //

    /// Dispatch one inbound message.
    ///
    /// `ping` is answered with `pong` and goes no further. Anything else first
    /// resolves a matching pending request, then reaches every listener for
    /// its type.
    pub fn handle_incoming(&self, message: IncomingMessage) {
        if message.message_type == PING_MESSAGE_TYPE {
            if let Err(e) = self.post(PONG_MESSAGE_TYPE, None) {
                error!("Failed to answer ping: {}", e);
            }
            return;
        }

        if self.inner.pending.resolve(&message) {
            debug!("Resolved pending {} reply", message.message_type);
        }

        let invoked = self.inner.listeners.dispatch(&message);
        if invoked == 0 && message.message_id.is_none() {
            debug!("No listener for {}", message.message_type);
        }
    }

    /// Decode a JSON frame and dispatch it.
    pub fn handle_raw(&self, frame: &str) -> Result<(), ProtocolError> {
        let message: IncomingMessage = serde_json::from_str(frame)?;
        self.handle_incoming(message);
        Ok(())
    }

    // ------------------------------------------------------------------ //
    // Listeners
    // ------------------------------------------------------------------ //

    /// Invoke `callback` for every inbound message of `message_type`.
    pub fn register<F>(&self, message_type: &str, callback: F) -> Subscription
    where
        F: Fn(&IncomingMessage) + Send + Sync + 'static,
    {
        self.inner.listeners.register(message_type, Arc::new(callback))
    }

    /// Register for `M`'s message type, decoding `data` into `M`.
    ///
    /// Messages whose data does not decode are logged and skipped.
    pub fn register_typed<M, F>(&self, callback: F) -> Subscription
    where
        M: MessageKind + DeserializeOwned,
        F: Fn(M, &IncomingMessage) + Send + Sync + 'static,
    {
        self.register(M::MESSAGE_TYPE, move |message| {
            match decode_payload::<M>(M::MESSAGE_TYPE, Some(&message.data)) {
                Ok(decoded) => callback(decoded, message),
                Err(e) => warn!("Skipping undecodable {}: {}", M::MESSAGE_TYPE, e),
            }
        })
    }

    /// Remove exactly the registration `id`. Returns false if it was not registered.
    pub fn unregister(&self, message_type: &str, id: ListenerId) -> bool {
        self.inner.listeners.unregister(message_type, id)
    }

    pub fn listener_count(&self, message_type: &str) -> usize {
        self.inner.listeners.count(message_type)
    }

    /// Requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}
