//! Error taxonomy reported by both ends of a signaling session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ParticipantId, RoomId};

pub type Result<T> = std::result::Result<T, SignalingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("participant '{participant}' is already in room '{room}'")]
    DuplicateParticipant {
        room: RoomId,
        participant: ParticipantId,
    },

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("unexpected answer: {0}")]
    UnexpectedAnswer(String),

    #[error("conflicting negotiation: {0}")]
    ConflictingNegotiation(String),

    #[error("transport closed")]
    TransportClosed,

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

impl SignalingError {
    /// Machine-readable reason sent in `error` frames.
    pub fn reason(&self) -> ErrorReason {
        match self {
            SignalingError::DuplicateParticipant { .. } => ErrorReason::DuplicateParticipant,
            SignalingError::UnknownParticipant(_) => ErrorReason::UnknownParticipant,
            SignalingError::UnexpectedAnswer(_) => ErrorReason::UnexpectedAnswer,
            SignalingError::ConflictingNegotiation(_) => ErrorReason::ConflictingNegotiation,
            SignalingError::TransportClosed => ErrorReason::TransportClosed,
            SignalingError::MalformedMessage(_) => ErrorReason::MalformedMessage,
        }
    }

    /// Only a closed transport ends a session; everything else drops one
    /// message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SignalingError::TransportClosed)
    }
}

/// Wire form of [`SignalingError`] kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReason {
    DuplicateParticipant,
    UnknownParticipant,
    UnexpectedAnswer,
    ConflictingNegotiation,
    TransportClosed,
    MalformedMessage,
}
