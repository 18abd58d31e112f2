use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Envelope Decode Error: {message} {location}")]
    Envelope {
        message: String,
        location: ErrorLocation,
    },

    #[error("Payload Decode Error for '{message_type}': {message} {location}")]
    Payload {
        message_type: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Payload Encode Error for '{message_type}': {message} {location}")]
    Encode {
        message_type: String,
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub fn payload(message_type: impl Into<String>, error: &serde_json::Error) -> Self {
        ProtocolError::Payload {
            message_type: message_type.into(),
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn encode(message_type: impl Into<String>, error: &serde_json::Error) -> Self {
        ProtocolError::Encode {
            message_type: message_type.into(),
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::Envelope {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
