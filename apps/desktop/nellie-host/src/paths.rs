//! Where the host keeps its config, logs, and runtime files.

use crate::error::NellieHostError;

use bridge_core::config::default_config_dir;

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "nellie-bridge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// `bridge.json` lives here.
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Creator submission cache and the connection-info file.
    pub data_dir: PathBuf,
}

impl HostPaths {
    /// Platform directories (`~/.config/nellie-bridge`, `~/.local/share/nellie-bridge` on Linux).
    pub fn resolve() -> Result<Self, NellieHostError> {
        let config_dir = default_config_dir()
            .ok_or_else(|| NellieHostError::app("Could not determine config directory"))?;
        let data_dir = dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| NellieHostError::app("Could not determine data directory"))?;

        Ok(Self {
            config_dir,
            log_dir: data_dir.join("logs"),
            data_dir,
        })
    }

    /// Everything under one root; used by tests and portable installs.
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            log_dir: root.join("logs"),
            data_dir: root.join("data"),
        }
    }

    pub fn ensure(&self) -> Result<(), NellieHostError> {
        for dir in [&self.config_dir, &self.log_dir, &self.data_dir] {
            create_dir_all(dir)
                .map_err(|e| NellieHostError::app(format!("Failed to create {}: {e}", dir.display())))?;
        }
        Ok(())
    }
}
