//! Configuration loading for the daemon binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerSection,
    /// Network listen configuration.
    pub listen: ListenSection,
    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutsSection,
    /// Static account blocks for the built-in credential backend.
    #[serde(default, rename = "account")]
    pub accounts: Vec<AccountBlock>,
    /// Optional on-disk message spool to seed maildrops from.
    pub spool: Option<SpoolSection>,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Name shown in the greeting banner (e.g., "pop.example.net").
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

fn default_server_name() -> String {
    "localhost".to_string()
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenSection {
    /// Address to bind to (e.g., "0.0.0.0:110").
    pub address: SocketAddr,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    /// Seconds of client inactivity before the connection is dropped.
    #[serde(default = "default_inactivity_secs")]
    pub inactivity_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            inactivity_secs: default_inactivity_secs(),
        }
    }
}

fn default_inactivity_secs() -> u64 {
    600
}

/// A static user account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountBlock {
    pub user: String,
    pub password: String,
}

/// On-disk message spool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SpoolSection {
    /// Directory holding one subdirectory of message files per user.
    pub directory: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
