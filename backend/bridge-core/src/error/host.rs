use crate::error::ProtocolError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HostError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Plan Generation Error: {message} {location}")]
    Plan {
        message: String,
        location: ErrorLocation,
    },

    #[error("State Error: {message} {location}")]
    State {
        message: String,
        location: ErrorLocation,
    },

    #[error("Submission Cache Error: {path}: {message} {location}")]
    Cache {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl HostError {
    #[track_caller]
    pub fn plan(message: impl Into<String>) -> Self {
        HostError::Plan {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn state(message: impl Into<String>) -> Self {
        HostError::State {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        HostError::Send {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn io(message: impl Into<String>) -> Self {
        HostError::Io {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HostError::Cache {
            path: path.into(),
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<IoError> for HostError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        HostError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
