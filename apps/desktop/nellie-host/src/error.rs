use bridge_core::error::{ConfigError, HostError};

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the host application.
///
/// Serializable so they can be written to the connection-info file or
/// reported to a supervising process as structured JSON.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum NellieHostError {
    /// Error from this app (paths, logger, startup)
    #[error("Nellie Host Error: {message} {location}")]
    App {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded or validated
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from the bridge host (bind, cache, state)
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },
}

impl NellieHostError {
    #[track_caller]
    pub fn app(message: impl Into<String>) -> Self {
        NellieHostError::App {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<ConfigError> for NellieHostError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        NellieHostError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<HostError> for NellieHostError {
    #[track_caller]
    fn from(error: HostError) -> Self {
        NellieHostError::Bridge {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
