use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "bridge.json";
const CONFIG_DIR_NAME: &str = "nellie-bridge";
const CONFIG_VERSION: u32 = 1;

/// Longest accepted heartbeat period (one hour).
pub const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 3_600;

pub const ENV_PORT: &str = "NELLIE_BRIDGE_PORT";
pub const ENV_TOKEN: &str = "NELLIE_BRIDGE_TOKEN";
pub const ENV_TIMEOUT_MS: &str = "NELLIE_BRIDGE_TIMEOUT_MS";

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// What the messenger does when the host channel is missing or closed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnavailableTransportPolicy {
    /// Drop the message with a warning; waiting callers time out.
    #[default]
    Ignore,
    /// Surface the failure to the caller.
    Fail,
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Token webviews must present; generated at startup when absent.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Seconds between host pings; 0 disables the heartbeat.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            auth_token: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl HostConfig {
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.heartbeat_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default)]
    pub unavailable_transport: UnavailableTransportPolicy,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout_ms(),
            unavailable_transport: UnavailableTransportPolicy::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl MessagingConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorConfig {
    /// How long a cached submission survives a host restart.
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
}

impl Default for CreatorConfig {
    fn default() -> Self {
        Self {
            cache_max_age_secs: default_cache_max_age_secs(),
        }
    }
}

impl CreatorConfig {
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub creator: CreatorConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            host: HostConfig::default(),
            messaging: MessagingConfig::default(),
            creator: CreatorConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_port() -> u16 {
    19876
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}
fn default_response_timeout_ms() -> u64 {
    10_000
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_cache_max_age_secs() -> u64 {
    20
}

/// Platform config directory for the bridge (`~/.config/nellie-bridge` on Linux).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from {config_dir}/bridge.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
            location: ErrorLocation::caller(),
            path: config_path.clone(),
            source: e,
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON at {}: {}", config_path.display(), e);
            ConfigError::Parse {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/bridge.json using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::caller(),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::caller(),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::caller(),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::caller(),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.messaging.response_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "messaging.response_timeout_ms must be greater than 0",
            ));
        }

        if self.host.heartbeat_interval_secs > MAX_HEARTBEAT_INTERVAL_SECS {
            return Err(ConfigError::validation(format!(
                "host.heartbeat_interval_secs must be at most {MAX_HEARTBEAT_INTERVAL_SECS} (0 disables)"
            )));
        }

        if self.messaging.connect_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "messaging.connect_timeout_ms must be greater than 0",
            ));
        }

        if let Some(ref token) = self.host.auth_token {
            if token.trim().is_empty() {
                return Err(ConfigError::validation(
                    "host.auth_token cannot be an empty string",
                ));
            }
        }

        Ok(())
    }

    /// Apply `NELLIE_BRIDGE_*` environment overrides, then re-validate.
    ///
    /// Call after `dotenvy` has loaded any `.env` file.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var(ENV_PORT) {
            self.host.port = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Environment {
                    location: ErrorLocation::caller(),
                    variable: ENV_PORT,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            info!("Port overridden from {ENV_PORT}: {}", self.host.port);
        }

        if let Ok(value) = env::var(ENV_TOKEN) {
            self.host.auth_token = Some(value);
            info!("Auth token overridden from {ENV_TOKEN}");
        }

        if let Ok(value) = env::var(ENV_TIMEOUT_MS) {
            self.messaging.response_timeout_ms =
                value.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Environment {
                        location: ErrorLocation::caller(),
                        variable: ENV_TIMEOUT_MS,
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
            info!(
                "Response timeout overridden from {ENV_TIMEOUT_MS}: {}ms",
                self.messaging.response_timeout_ms
            );
        }

        self.validate()
    }
}
