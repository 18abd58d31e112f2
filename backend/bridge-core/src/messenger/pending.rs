//! Pending-response bookkeeping for requests awaiting a correlated reply.

use crate::error::MessengerError;
use crate::protocol::{IncomingMessage, MessageId};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Map of outstanding request ids to the channel that resolves them.
#[derive(Default)]
pub(crate) struct PendingResponses {
    entries: Mutex<HashMap<MessageId, oneshot::Sender<IncomingMessage>>>,
}

impl PendingResponses {
    /// Track `id` and return the handle the caller awaits on.
    pub(crate) fn track(self: &Arc<Self>, id: MessageId, message_type: &str) -> PendingResponse {
        let (sender, receiver) = oneshot::channel();
        self.entries.lock().insert(id.clone(), sender);

        PendingResponse {
            id,
            message_type: message_type.to_string(),
            receiver,
            registry: Arc::clone(self),
        }
    }

    /// Resolve the entry for `message`'s id, if one is pending.
    ///
    /// Returns true if a waiting request was resolved.
    pub(crate) fn resolve(&self, message: &IncomingMessage) -> bool {
        let Some(id) = message.message_id.as_ref() else {
            return false;
        };

        let Some(sender) = self.entries.lock().remove(id) else {
            return false;
        };

        if sender.send(message.clone()).is_err() {
            // Waiter was dropped between lookup and send.
            debug!("Reply {} arrived after its waiter went away", id);
            return false;
        }

        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn forget(&self, id: &MessageId) {
        self.entries.lock().remove(id);
    }
}

/// A request waiting for its reply.
///
/// Dropping it removes the pending entry, so abandoned requests do not leak.
pub(crate) struct PendingResponse {
    id: MessageId,
    message_type: String,
    receiver: oneshot::Receiver<IncomingMessage>,
    registry: Arc<PendingResponses>,
}

impl PendingResponse {
    /// Wait for the correlated reply or fail after `timeout`.
    pub(crate) async fn wait(mut self, timeout: Duration) -> Result<IncomingMessage, MessengerError> {
        // The sender stays in the map until `resolve` uses it or this waiter
        // drops, so the receiver either yields a reply or times out.
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) | Err(_) => {
                warn!(
                    "Message {} ({}) timed out after {:?}",
                    self.message_type, self.id, timeout
                );
                Err(MessengerError::timeout(
                    &self.message_type,
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.registry.forget(&self.id);
    }
}
