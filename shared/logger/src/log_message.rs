//! Internal log line structure.

use std::sync::Arc;

use crate::log_level::LogLevel;
use chrono::Local;

/// A single formatted-on-demand log line.
#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub timestamp: String,
    pub level: LogLevel,
    pub component: Option<Arc<str>>,
    pub context: Arc<[(String, String)]>,
    pub message: String,
}

impl LogMessage {
    pub fn new(
        level: LogLevel,
        component: Option<Arc<str>>,
        context: Arc<[(String, String)]>,
        message: String,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level,
            component,
            context,
            message,
        }
    }

    /// `[timestamp] LEVEL [component] key=value ...: message\n`
    pub fn format(&self) -> String {
        let mut line = format!("[{}] {}", self.timestamp, self.level.as_str());
        if let Some(component) = &self.component {
            line.push_str(&format!(" [{}]", component));
        }
        for (key, value) in self.context.iter() {
            line.push_str(&format!(" {}={}", key, value));
        }
        line.push_str(": ");
        line.push_str(&self.message);
        line.push('\n');
        line
    }
}
