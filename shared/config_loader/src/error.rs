use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while locating, reading or parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file at the given location(s).
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// The content is not valid JSON for the requested type.
    #[error("Invalid configuration in {source_name}: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },
}
