use crate::error::TransportError;
use crate::protocol::OutgoingMessage;
use crate::transport::HostTransport;

use tokio::sync::mpsc;

/// In-process transport backed by an unbounded channel.
///
/// Used when the host lives in the same process, and by tests to observe
/// exactly what the messenger posts.
#[derive(Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<OutgoingMessage>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the host reads from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl HostTransport for ChannelTransport {
    fn post(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        self.sender
            .send(message.clone())
            .map_err(|_| TransportError::unavailable("host receiver dropped"))
    }
}

/// Transport with no host attached; every post is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedTransport;

impl HostTransport for DetachedTransport {
    fn post(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        Err(TransportError::unavailable(format!(
            "no host channel attached (dropping {})",
            message.message_type
        )))
    }
}
