//! JSON wire messages, discriminated by their `id` field.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::candidate::IceCandidate;
use crate::error::{ErrorReason, SignalingError};
use crate::ids::{ParticipantId, RoomId};

/// Messages sent by a client to the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinRoom {
        name: ParticipantId,
        room: RoomId,
    },
    /// Offer for the leg carrying `sender`'s media to the requesting
    /// client. `sender` equal to the client itself publishes its media.
    ReceiveVideoFrom {
        sender: ParticipantId,
        #[serde(rename = "sdpOffer")]
        sdp_offer: String,
    },
    /// Local candidate for the leg identified by `name` (same convention
    /// as `sender` above).
    OnIceCandidate {
        name: ParticipantId,
        candidate: IceCandidate,
    },
    LeaveRoom,
}

/// Messages sent by the signaling server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum ServerMessage {
    ExistingParticipants {
        data: Vec<ParticipantId>,
    },
    NewParticipantArrived {
        name: ParticipantId,
    },
    ReceiveVideoAnswer {
        name: ParticipantId,
        #[serde(rename = "sdpAnswer")]
        sdp_answer: String,
    },
    IceCandidate {
        name: ParticipantId,
        candidate: IceCandidate,
    },
    ParticipantLeft {
        name: ParticipantId,
    },
    Error {
        reason: ErrorReason,
        message: String,
    },
}

/// Why an inbound frame could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Well-formed envelope with an `id` this side does not handle.
    #[error("unknown message kind '{0}'")]
    UnknownKind(String),
    #[error("{0}")]
    Malformed(String),
}

impl From<DecodeError> for SignalingError {
    fn from(err: DecodeError) -> Self {
        SignalingError::MalformedMessage(err.to_string())
    }
}

fn decode_envelope<T: DeserializeOwned>(text: &str, known: &[&str]) -> Result<T, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let kind = value
        .get("id")
        .ok_or_else(|| DecodeError::Malformed("missing 'id' field".to_string()))?
        .as_str()
        .ok_or_else(|| DecodeError::Malformed("'id' must be a string".to_string()))?
        .to_string();
    if !known.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownKind(kind));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed(format!("{kind}: {e}")))
}

impl ClientMessage {
    pub const KINDS: [&'static str; 4] =
        ["joinRoom", "receiveVideoFrom", "onIceCandidate", "leaveRoom"];

    /// Decodes a client frame. Identifiers are trimmed, and blank ones make
    /// the frame malformed.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        decode_envelope(text, &Self::KINDS)
    }

    pub fn encode(&self) -> String {
        // Plain enum of strings and JSON values always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "joinRoom",
            ClientMessage::ReceiveVideoFrom { .. } => "receiveVideoFrom",
            ClientMessage::OnIceCandidate { .. } => "onIceCandidate",
            ClientMessage::LeaveRoom => "leaveRoom",
        }
    }
}

impl ServerMessage {
    pub const KINDS: [&'static str; 6] = [
        "existingParticipants",
        "newParticipantArrived",
        "receiveVideoAnswer",
        "iceCandidate",
        "participantLeft",
        "error",
    ];

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        decode_envelope(text, &Self::KINDS)
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Builds the `error` frame reporting `err` to the client.
    pub fn rejection(err: &SignalingError) -> Self {
        ServerMessage::Error {
            reason: err.reason(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ExistingParticipants { .. } => "existingParticipants",
            ServerMessage::NewParticipantArrived { .. } => "newParticipantArrived",
            ServerMessage::ReceiveVideoAnswer { .. } => "receiveVideoAnswer",
            ServerMessage::IceCandidate { .. } => "iceCandidate",
            ServerMessage::ParticipantLeft { .. } => "participantLeft",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join_room() {
        let msg = ClientMessage::decode(r#"{"id":"joinRoom","name":"alice","room":"r1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                name: ParticipantId::from("alice"),
                room: RoomId::from("r1"),
            }
        );
    }

    #[test]
    fn test_decode_offer_uses_camel_case_fields() {
        let msg = ClientMessage::decode(
            r#"{"id":"receiveVideoFrom","sender":"bob","sdpOffer":"v=0\r\n"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::ReceiveVideoFrom {
                sender: ParticipantId::from("bob"),
                sdp_offer: "v=0\r\n".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_leave_room_without_fields() {
        assert_eq!(
            ClientMessage::decode(r#"{"id":"leaveRoom"}"#).unwrap(),
            ClientMessage::LeaveRoom
        );
    }

    #[test]
    fn test_candidate_is_kept_verbatim() {
        let candidate = json!({
            "candidate": "candidate:1 1 UDP 2122252543 10.0.0.2 50000 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0,
            "usernameFragment": "abcd"
        });
        let text = json!({"id": "onIceCandidate", "name": "alice", "candidate": candidate}).to_string();

        match ClientMessage::decode(&text).unwrap() {
            ClientMessage::OnIceCandidate { candidate: c, .. } => {
                assert_eq!(c.as_value(), &candidate)
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_distinguished_from_malformed() {
        assert_eq!(
            ClientMessage::decode(r#"{"id":"stop"}"#),
            Err(DecodeError::UnknownKind("stop".to_string()))
        );
        assert!(matches!(
            ClientMessage::decode(r#"{"name":"alice"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::decode("not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::decode(r#"{"id":"joinRoom","name":"alice"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_blank_names_are_malformed() {
        assert!(matches!(
            ClientMessage::decode(r#"{"id":"joinRoom","name":" ","room":"r1"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_padded_names_are_trimmed() {
        assert_eq!(
            ClientMessage::decode(r#"{"id":"joinRoom","name":" alice ","room":"r1 "}"#).unwrap(),
            ClientMessage::JoinRoom {
                name: ParticipantId::from("alice"),
                room: RoomId::from("r1"),
            }
        );
    }

    #[test]
    fn test_malformed_body_names_its_kind() {
        match ClientMessage::decode(r#"{"id":"receiveVideoFrom","sender":"bob"}"#) {
            Err(DecodeError::Malformed(reason)) => assert!(reason.starts_with("receiveVideoFrom:")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_server_messages_encode_contract_field_names() {
        let answer = ServerMessage::ReceiveVideoAnswer {
            name: ParticipantId::from("alice"),
            sdp_answer: "A1".to_string(),
        };
        let value: Value = serde_json::from_str(&answer.encode()).unwrap();
        assert_eq!(
            value,
            json!({"id": "receiveVideoAnswer", "name": "alice", "sdpAnswer": "A1"})
        );

        let existing = ServerMessage::ExistingParticipants {
            data: vec![ParticipantId::from("alice"), ParticipantId::from("bob")],
        };
        let value: Value = serde_json::from_str(&existing.encode()).unwrap();
        assert_eq!(value, json!({"id": "existingParticipants", "data": ["alice", "bob"]}));
    }

    #[test]
    fn test_rejection_frame() {
        let err = SignalingError::DuplicateParticipant {
            room: RoomId::from("r1"),
            participant: ParticipantId::from("alice"),
        };
        let value: Value = serde_json::from_str(&ServerMessage::rejection(&err).encode()).unwrap();
        assert_eq!(value["id"], "error");
        assert_eq!(value["reason"], "DuplicateParticipant");
    }

    #[test]
    fn test_server_decode_round_trips_kind() {
        for text in [
            r#"{"id":"newParticipantArrived","name":"bob"}"#,
            r#"{"id":"participantLeft","name":"bob"}"#,
            r#"{"id":"iceCandidate","name":"bob","candidate":{"candidate":"c"}}"#,
        ] {
            let msg = ServerMessage::decode(text).unwrap();
            let kind: Value = serde_json::from_str(text).unwrap();
            assert_eq!(msg.kind(), kind["id"]);
        }
    }
}
