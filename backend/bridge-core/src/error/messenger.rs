//! Error types for the webview-side messenger.
//!
//! - Timeouts carry the message type so callers can tell which request stalled
//! - Transport and protocol failures are wrapped transparently
//! - All errors include ErrorLocation for debugging

use crate::error::{ProtocolError, TransportError};

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MessengerError {
    #[error("Timeout Error: Message {message_type} timed out after {timeout_ms}ms {location}")]
    Timeout {
        message_type: String,
        timeout_ms: u64,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl MessengerError {
    #[track_caller]
    pub fn timeout(message_type: impl Into<String>, timeout_ms: u64) -> Self {
        MessengerError::Timeout {
            message_type: message_type.into(),
            timeout_ms,
            location: ErrorLocation::caller(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MessengerError::Timeout { .. })
    }
}
