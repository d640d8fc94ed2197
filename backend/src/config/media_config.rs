use serde::{Deserialize, Serialize};

/// Media server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub kurento_uri: String,
    pub request_timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            kurento_uri: "ws://127.0.0.1:8888/kurento".to_string(),
            request_timeout_ms: 5000,
        }
    }
}
