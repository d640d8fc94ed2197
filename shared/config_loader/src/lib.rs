//! # Config Loader
//!
//! Locates and loads JSON configuration files.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_json_file};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Default)]
//! #[serde(default)]
//! struct MyConfig {
//!     port: u16,
//! }
//!
//! fn main() -> Result<(), config_loader::ConfigError> {
//!     let path = find_config_file("server_config.json")?;
//!     let config: MyConfig = load_json_file(&path)?;
//!     println!("port = {}", config.port);
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable checked first by [`find_config_file`].
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Reads a configuration file into a string without interpreting it.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))
}

/// Searches the usual locations for a configuration file.
///
/// Search order:
/// 1. The `CONFIG_PATH` environment variable (if it points to a file)
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let path_buf = PathBuf::from(&path);
        if path_buf.is_file() {
            return Ok(path_buf);
        }
    }

    let candidates = [
        PathBuf::from("./config").join(filename),
        PathBuf::from("./").join(filename),
    ];
    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            ConfigError::FileNotFound(format!(
                "'{}' not found. Searched: {} env var, ./config/{}, ./{}",
                filename, CONFIG_PATH_ENV, filename, filename
            ))
        })
}

/// Parses a JSON document into `T`, naming `source_name` in errors.
pub fn parse_json<T: DeserializeOwned>(content: &str, source_name: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

/// Reads and parses a JSON configuration file.
pub fn load_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = load_config_file(path)?;
    parse_json(&content, &path.display().to_string())
}

/// Combines [`find_config_file`] and [`load_json_file`].
pub fn find_and_load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = find_config_file(filename)?;
    load_json_file(path)
}
