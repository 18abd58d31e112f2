//! Type-keyed listener registry.

use crate::protocol::IncomingMessage;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::Mutex;

/// Callback invoked for every inbound message of a registered type.
pub type Listener = Arc<dyn Fn(&IncomingMessage) + Send + Sync>;

/// Identity of one registration.
///
/// Closures have no identity of their own, so unregistering goes through the
/// id handed out at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
}

impl ListenerRegistry {
    pub(crate) fn register(self: &Arc<Self>, message_type: &str, listener: Listener) -> Subscription {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.listeners
            .lock()
            .entry(message_type.to_string())
            .or_default()
            .push((id, listener));

        trace!("Registered listener {:?} for {}", id, message_type);

        Subscription {
            message_type: message_type.to_string(),
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove exactly the registration `id`. Returns false if it was not registered.
    pub(crate) fn unregister(&self, message_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();

        let Some(entries) = listeners.get_mut(message_type) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            listeners.remove(message_type);
        }

        removed
    }

    /// Invoke every listener for `message`'s type, in registration order.
    ///
    /// The list is snapshotted first so callbacks may register or unregister
    /// without deadlocking; such changes apply from the next message on.
    pub(crate) fn dispatch(&self, message: &IncomingMessage) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.lock().get(&message.message_type) {
            Some(entries) => entries.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            None => return 0,
        };

        for listener in &snapshot {
            listener(message);
        }

        snapshot.len()
    }

    pub(crate) fn count(&self, message_type: &str) -> usize {
        self.listeners
            .lock()
            .get(message_type)
            .map_or(0, Vec::len)
    }
}

/// Handle returned by [`Messenger::register`](crate::messenger::Messenger::register).
///
/// Dropping the subscription does not unregister the listener; call
/// [`Subscription::unregister`].
#[derive(Debug, Clone)]
pub struct Subscription {
    message_type: String,
    id: ListenerId,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Remove the listener. Calling this again is a no-op returning false.
    pub fn unregister(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unregister(&self.message_type, self.id),
            None => false,
        }
    }
}
