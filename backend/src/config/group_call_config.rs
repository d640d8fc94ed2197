use std::path::Path;

use config_loader::ConfigError;
use serde::{Deserialize, Serialize};

use crate::config::{LoggingConfig, MediaConfig, ServerConfig};

/// File looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "server_config.json";

/// Group call server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupCallConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub media: MediaConfig,
}

impl GroupCallConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        config_loader::load_json_file(path)
    }

    /// Load [`DEFAULT_CONFIG_FILE`] from the standard locations
    pub fn find_default() -> Result<Self, ConfigError> {
        config_loader::find_and_load_json(DEFAULT_CONFIG_FILE)
    }

    /// Parse configuration given inline, e.g. through an environment variable
    pub fn from_json_str(json: &str, source_name: &str) -> Result<Self, ConfigError> {
        config_loader::parse_json(json, source_name)
    }
}
