use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ICE candidate exactly as the endpoint produced it.
///
/// Signaling never looks inside; only media engines do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IceCandidate(Value);

impl IceCandidate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
