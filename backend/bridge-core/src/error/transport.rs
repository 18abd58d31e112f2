use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    /// The host channel is absent or already closed.
    #[error("Transport Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn unavailable(message: impl Into<String>) -> Self {
        TransportError::Unavailable {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn connect(message: impl Into<String>) -> Self {
        TransportError::Connect {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, TransportError::Unavailable { .. })
    }
}

impl From<serde_json::Error> for TransportError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        TransportError::Encode {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
