//! Thread-safe asynchronous logging library.
//!
//! Lines are formatted on the caller's thread and appended to the log file
//! by a single writer thread shared by every logger derived from the same
//! root, so component and session loggers are cheap to create.

pub mod error;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_level::LogLevel;
pub use logger::Logger;
