//! Error types for logging operations.

use std::io;

use thiserror::Error;

/// Result type for logging operations.
pub type Result<T> = std::result::Result<T, LoggingError>;

/// Errors that can occur while setting up a logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The configured level name is not one of debug/info/warn/error.
    #[error("Unknown log level: '{0}'")]
    UnknownLevel(String),
}
