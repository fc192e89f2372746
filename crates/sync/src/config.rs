// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration management.
//!
//! Configuration is stored in `<config_dir>/orb-sync/config.toml`. Every
//! field has a default, so an empty file (or no file) is a valid config:
//! - `ws_url`: real-time endpoint; token and group id are appended as query
//! - `api_base_url`: HTTP origin for the fallback endpoints
//! - timer periods in milliseconds and the `[reconnect]` policy

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{ConnectionSettings, ReconnectPolicy};

const APP_DIR_NAME: &str = "orb-sync";
const CONFIG_FILE_NAME: &str = "config.toml";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Real-time endpoint (`ws://` or `wss://`).
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Origin of the family sharing REST API (`http://` or `https://`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Id of the signed-in member, used to suppress echoes of our own actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Heartbeat period while connected (default: 30000).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Fallback poll period while not connected (default: 5000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum gap between accepted state pushes (default: 1000).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Upper bound on the real-time handshake (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnection settings under `[reconnect]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectConfig {
    /// Retries after an unexpected closure before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each later one (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws/family/orb-sync/".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_debounce_ms() -> u64 {
    1_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ws_url: default_ws_url(),
            api_base_url: default_api_base_url(),
            user_id: None,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    /// Parses and validates a config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Config::parse(&content)
    }

    /// Checks URL schemes and timer periods.
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "invalid ws_url '{}': must start with ws:// or wss://",
                self.ws_url
            )));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "invalid api_base_url '{}': must start with http:// or https://",
                self.api_base_url
            )));
        }
        for (name, value) in [
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("reconnect.base_delay_ms", self.reconnect.base_delay_ms),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }
        Ok(())
    }

    /// Settings for the real-time connection manager.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            ws_url: self.ws_url.clone(),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect.max_attempts,
                base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Default config file location: `ORB_SYNC_CONFIG`, else the platform config dir.
pub fn default_config_path() -> PathBuf {
    env::config_path().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

/// Directory for client state such as stored credentials.
pub fn state_dir() -> PathBuf {
    env::state_dir().unwrap_or_else(|| {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    })
}

/// Default location of the credential file.
pub fn default_credentials_path() -> PathBuf {
    state_dir().join(CREDENTIALS_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
