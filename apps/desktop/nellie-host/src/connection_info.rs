//! Connection details a webview launcher needs to reach the bridge host.

use crate::error::NellieHostError;

use bridge_core::host::BridgeHostHandle;

use common::RedactedToken;

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

pub const CONNECTION_FILE_NAME: &str = "bridge_connection.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    port: u16,
    auth_token: RedactedToken,
}

/// On-disk shape. Only this type ever sees the token in clear.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionFile {
    port: u16,
    auth_token: String,
}

impl ConnectionInfo {
    pub fn new(port: u16, auth_token: impl Into<String>) -> Self {
        Self {
            port,
            auth_token: RedactedToken::new(auth_token),
        }
    }

    pub fn from_handle(handle: &BridgeHostHandle) -> Self {
        Self::new(handle.port(), handle.auth_token())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn auth_token(&self) -> &str {
        self.auth_token.expose()
    }

    /// Write `{dir}/bridge_connection.json` via temp file + rename, replacing
    /// any previous run's file. Owner-only on Unix since it holds the token.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, NellieHostError> {
        let path = dir.join(CONNECTION_FILE_NAME);
        let temp_path = path.with_extension("json.tmp");
        let file = ConnectionFile {
            port: self.port,
            auth_token: self.auth_token.expose().to_string(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| NellieHostError::app(format!("Failed to serialize connection info: {e}")))?;

        let write_failed =
            |e: std::io::Error| NellieHostError::app(format!("Failed to write {}: {e}", temp_path.display()));
        let mut temp = owner_only_options().open(&temp_path).map_err(write_failed)?;
        temp.write_all(json.as_bytes()).map_err(write_failed)?;
        temp.sync_all().map_err(write_failed)?;
        drop(temp);

        std::fs::rename(&temp_path, &path)
            .map_err(|e| NellieHostError::app(format!("Failed to replace {}: {e}", path.display())))?;

        Ok(path)
    }

    pub fn read(dir: &Path) -> Result<Self, NellieHostError> {
        let path = dir.join(CONNECTION_FILE_NAME);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| NellieHostError::app(format!("Failed to read {}: {e}", path.display())))?;
        let file: ConnectionFile = serde_json::from_str(&json)
            .map_err(|e| NellieHostError::app(format!("Failed to parse {}: {e}", path.display())))?;

        Ok(Self::new(file.port, file.auth_token))
    }

    /// Remove the file on shutdown so launchers don't dial a dead port.
    pub fn remove(dir: &Path) {
        let path = dir.join(CONNECTION_FILE_NAME);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove {}: {e}", path.display()),
        }
    }
}

fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
}
