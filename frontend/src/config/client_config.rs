//! Client configuration
//!
//! Server URL and logging settings, read from JSON like the server's.

use std::path::{Path, PathBuf};

use config_loader::ConfigError;
use logging::{LogLevel, Logger, LoggingError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `ws://` or `wss://` URL of the signaling endpoint
    pub server_url: String,
    /// Accept self-signed certificates on `wss://`
    pub accept_invalid_certs: bool,
    pub log_path: PathBuf,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://localhost:8080/rtc".to_string(),
            accept_invalid_certs: false,
            log_path: PathBuf::from("groupcall-client.log"),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        config_loader::load_json_file(path)
    }

    pub fn from_json_str(json: &str, source_name: &str) -> Result<Self, ConfigError> {
        config_loader::parse_json(json, source_name)
    }

    /// Unknown level names fall back to `Info`.
    pub fn level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }

    pub fn is_secure(&self) -> bool {
        self.server_url.starts_with("wss://")
    }

    /// File logger at `log_path` with the configured level.
    pub fn logger(&self) -> Result<Logger, LoggingError> {
        Logger::with_component(self.log_path.clone(), self.level(), "Client", false)
    }
}
