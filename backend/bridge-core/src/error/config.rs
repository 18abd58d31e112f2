use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {reason} {location}")]
    Parse {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Config Write Error: {path}: {source} {location}")]
    Write {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Serialization Error: {reason} {location}")]
    Serialize {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Validation Error: {reason} {location}")]
    Validation {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Environment Error: {variable}={value:?}: {reason} {location}")]
    Environment {
        location: ErrorLocation,
        variable: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    #[track_caller]
    pub fn validation(reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            location: ErrorLocation::caller(),
            reason: reason.into(),
        }
    }
}
