//! Configuration system for routesync.
//!
//! Resolution order: environment variables → config file → defaults.
//! Command-line flags are applied on top by the daemon.
//!
//! Config file location:
//!   1. $ROUTESYNC_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/routesync/config.toml
//!   3. ~/.config/routesync/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesyncConfig {
    pub interface: InterfaceConfig,
    pub poll: PollConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// WireGuard device to monitor. Empty = must be given on the command line.
    pub name: String,
    /// Only consider routes with this protocol tag. Empty = all routes.
    pub proto: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between reconciliation passes.
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// iproute2 binary.
    pub ip: String,
    /// wireguard-tools binary.
    pub wg: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_INTERVAL_SECS: u64 = 10;

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ip: "ip".to_string(),
            wg: "wg".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("routesync")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RoutesyncConfig {
    /// Load config from `path`: env vars → file → defaults.
    /// A missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            RoutesyncConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("ROUTESYNC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config to `path` if nothing is there yet.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
            }
            let text = toml::to_string_pretty(&RoutesyncConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(path, text)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        Ok(())
    }

    /// Route protocol filter, `None` when unset.
    pub fn proto(&self) -> Option<&str> {
        Some(self.interface.proto.as_str()).filter(|p| !p.is_empty())
    }

    /// Poll period, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs.max(1))
    }

    /// Apply ROUTESYNC_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ROUTESYNC_INTERFACE__NAME") {
            self.interface.name = v;
        }
        if let Some(v) = lookup("ROUTESYNC_INTERFACE__PROTO") {
            self.interface.proto = v;
        }
        if let Some(v) = lookup("ROUTESYNC_POLL__INTERVAL_SECS") {
            match v.parse() {
                Ok(secs) => self.poll.interval_secs = secs,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid ROUTESYNC_POLL__INTERVAL_SECS"),
            }
        }
        if let Some(v) = lookup("ROUTESYNC_TOOLS__IP") {
            self.tools.ip = v;
        }
        if let Some(v) = lookup("ROUTESYNC_TOOLS__WG") {
            self.tools.wg = v;
        }
    }
}
