//! Kurento JSON-RPC 2.0 message shapes.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::domain::IceCandidate;
use crate::infrastructure::media::MediaError;

/// Method and parameters of one outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: &'static str,
    pub params: Value,
}

impl RpcCall {
    pub fn create(kind: &str, constructor_params: Value) -> Self {
        RpcCall {
            method: "create",
            params: json!({ "type": kind, "constructorParams": constructor_params }),
        }
    }

    pub fn invoke(object: &str, operation: &str, operation_params: Value) -> Self {
        RpcCall {
            method: "invoke",
            params: json!({
                "object": object,
                "operation": operation,
                "operationParams": operation_params,
            }),
        }
    }

    pub fn subscribe(object: &str, event: &str) -> Self {
        RpcCall {
            method: "subscribe",
            params: json!({ "object": object, "type": event }),
        }
    }

    pub fn release(object: &str) -> Self {
        RpcCall {
            method: "release",
            params: json!({ "object": object }),
        }
    }

    /// Serializes the call with request `id`, adding `sessionId` once the
    /// server assigned one.
    pub fn encode(&self, id: u64, session_id: Option<&str>) -> String {
        let mut params = self.params.clone();
        if let (Some(session), Some(map)) = (session_id, params.as_object_mut()) {
            map.insert("sessionId".to_string(), Value::String(session.to_string()));
        }
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.method,
            "params": params,
        })
        .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: Option<u64>,
    method: Option<String>,
    params: Option<Value>,
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Event raised by a media object.
#[derive(Debug, Clone, PartialEq)]
pub struct KurentoEvent {
    pub kind: String,
    pub object: String,
    pub data: Value,
}

/// Something read from the media server.
#[derive(Debug)]
pub enum Incoming {
    Response {
        id: u64,
        result: Result<Value, MediaError>,
    },
    Event(KurentoEvent),
    /// Anything else (requests from the server, pings); ignored.
    Other,
}

pub fn parse_incoming(text: &str) -> Result<Incoming, MediaError> {
    let raw: RawMessage =
        serde_json::from_str(text).map_err(|e| MediaError::Protocol(e.to_string()))?;

    if raw.method.as_deref() == Some("onEvent") {
        let value = raw
            .params
            .as_ref()
            .and_then(|p| p.get("value"))
            .ok_or_else(|| MediaError::Protocol("onEvent without value".to_string()))?;
        let text_field = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| MediaError::Protocol(format!("onEvent without '{field}'")))
        };
        return Ok(Incoming::Event(KurentoEvent {
            kind: text_field("type")?,
            object: text_field("object")?,
            data: value.get("data").cloned().unwrap_or(Value::Null),
        }));
    }

    let Some(id) = raw.id else {
        return Ok(Incoming::Other);
    };
    if raw.method.is_some() {
        return Ok(Incoming::Other);
    }
    let result = match (raw.result, raw.error) {
        (_, Some(err)) => Err(MediaError::Rejected {
            operation: format!("request {id}"),
            message: format!("{} (code {})", err.message, err.code),
        }),
        (Some(result), None) => Ok(result),
        (None, None) => Ok(Value::Null),
    };
    Ok(Incoming::Response { id, result })
}

/// `sessionId` carried by a successful result.
pub fn session_id(result: &Value) -> Option<&str> {
    result.get("sessionId").and_then(Value::as_str)
}

/// `value` of a successful result, as a string.
pub fn string_value(result: &Value) -> Option<&str> {
    result.get("value").and_then(Value::as_str)
}

const TYPE_TAGS: [&str; 2] = ["__module__", "__type__"];

/// Browser-style candidate (`candidate`, `sdpMid`, `sdpMLineIndex`) from
/// the payload of an `IceCandidateFound` event.
pub fn candidate_from_event(data: &Value) -> Option<IceCandidate> {
    let fields = data.get("candidate")?.as_object()?;
    let stripped: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !TYPE_TAGS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Some(IceCandidate::new(Value::Object(stripped)))
}

/// Candidate in the typed form `addIceCandidate` expects.
pub fn candidate_to_kurento(candidate: &IceCandidate) -> Value {
    let mut fields = candidate.as_value().as_object().cloned().unwrap_or_default();
    fields.insert("__module__".to_string(), json!("kurento"));
    fields.insert("__type__".to_string(), json!("IceCandidate"));
    Value::Object(fields)
}
