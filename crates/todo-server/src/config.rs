//! Configuration file parsing for the server.
//!
//! Loads bind address, database location, log filter and sweeper settings
//! from TOML. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use todo_sweeper::SweeperConfig;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Value present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SQLite database file; `:memory:` keeps everything in RAM
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Past-due sweeper settings
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_database_path() -> PathBuf {
    PathBuf::from("todo.db")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            database_path: default_database_path(),
            log_filter: default_log_filter(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path is empty".to_string()));
        }
        self.sweeper
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Apply command-line overrides on top of the file
    pub fn apply_overrides(&mut self, bind: Option<SocketAddr>, database: Option<PathBuf>) {
        if let Some(addr) = bind {
            self.bind_address = addr.ip().to_string();
            self.bind_port = addr.port();
        }
        if let Some(path) = database {
            self.database_path = path;
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
