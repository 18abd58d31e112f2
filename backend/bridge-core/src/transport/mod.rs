//! Host transports the [`Messenger`](crate::messenger::Messenger) posts through.
//!
//! The transport is the webview's view of the host channel (the
//! `postMessage` equivalent). Posting is synchronous and never waits for the
//! host; replies come back through [`Messenger::handle_incoming`](crate::messenger::Messenger::handle_incoming).

mod channel;
pub mod websocket;

pub use channel::{ChannelTransport, DetachedTransport};
pub use websocket::{WebviewConnection, connect_webview};

use crate::error::TransportError;
use crate::protocol::OutgoingMessage;

/// Outbound side of the host channel.
pub trait HostTransport: Send + Sync {
    /// Hand `message` to the host.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Unavailable`] - no host channel, or it has closed
    /// - [`TransportError::Encode`] - the message could not be serialized
    fn post(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}
