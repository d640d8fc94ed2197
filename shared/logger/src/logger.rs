//! Thread-safe asynchronous logger implementation.
//!
//! This module provides the main [`Logger`] interface for logging messages
//! to a file without blocking the caller.

use crate::error::Result;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::spawn_writer_thread;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};

/// Thread-safe, non-blocking logger.
///
/// Clones and derived loggers ([`Logger::for_component`],
/// [`Logger::with_context`]) share the writer thread of the logger they
/// were derived from.
///
/// # Examples
///
/// ```no_run
/// use logging::{Logger, LogLevel};
///
/// let logger = Logger::new("server.log".into(), LogLevel::Info).unwrap();
/// let session = logger
///     .for_component("Session")
///     .with_context("room", "r1")
///     .with_context("participant", "alice");
/// session.info("joined");
/// ```
#[derive(Clone)]
pub struct Logger {
    sender: Option<Sender<LogMessage>>,
    level: LogLevel,
    component: Option<Arc<str>>,
    context: Arc<[(String, String)]>,
    console_output: bool,
}

impl Logger {
    /// Creates a file logger with a dedicated writer thread.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        Self::build(Some(log_path), level, None, false)
    }

    /// Creates a file logger tagged with a component name, optionally
    /// echoing every line to stdout.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn with_component(
        log_path: PathBuf,
        level: LogLevel,
        component: &str,
        console_output: bool,
    ) -> Result<Self> {
        Self::build(Some(log_path), level, Some(component), console_output)
    }

    /// Creates a logger that only prints to stdout.
    pub fn console_only(level: LogLevel, component: &str) -> Self {
        Logger {
            sender: None,
            level,
            component: Some(Arc::from(component)),
            context: Arc::from(Vec::new()),
            console_output: true,
        }
    }

    /// Creates a logger that records nothing.
    pub fn disabled() -> Self {
        Logger {
            sender: None,
            level: LogLevel::Error,
            component: None,
            context: Arc::from(Vec::new()),
            console_output: false,
        }
    }

    fn build(
        log_path: Option<PathBuf>,
        level: LogLevel,
        component: Option<&str>,
        console_output: bool,
    ) -> Result<Self> {
        let sender = match log_path {
            Some(path) => {
                let (sender, receiver) = channel();
                spawn_writer_thread(&path, receiver)?;
                Some(sender)
            }
            None => None,
        };
        Ok(Logger {
            sender,
            level,
            component: component.map(Arc::from),
            context: Arc::from(Vec::new()),
            console_output,
        })
    }

    /// Returns a logger for another component writing to the same file.
    pub fn for_component(&self, component: &str) -> Self {
        Logger {
            component: Some(Arc::from(component)),
            ..self.clone()
        }
    }

    /// Returns a logger that appends `key=value` to every line.
    ///
    /// A key that is already present is replaced rather than repeated.
    pub fn with_context(&self, key: &str, value: impl ToString) -> Self {
        let mut context: Vec<(String, String)> = self
            .context
            .iter()
            .filter(|(existing, _)| existing != key)
            .cloned()
            .collect();
        context.push((key.to_string(), value.to_string()));
        Logger {
            context: Arc::from(context),
            ..self.clone()
        }
    }

    /// Minimum level recorded by this logger.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if level < self.level || (self.sender.is_none() && !self.console_output) {
            return;
        }
        let msg = LogMessage::new(
            level,
            self.component.clone(),
            Arc::clone(&self.context),
            message.to_string(),
        );

        if self.console_output {
            print!("{}", msg.format());
        }

        if let Some(sender) = &self.sender {
            // The writer only disappears at process exit.
            let _ = sender.send(msg);
        }
    }
}
