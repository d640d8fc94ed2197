//! Client error types.

use signaling::{ErrorReason, ParticipantId, SignalingError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    /// The server refused a request with an `error` frame.
    #[error("server rejected request ({reason:?}): {message}")]
    Rejected { reason: ErrorReason, message: String },

    #[error("local media failed for '{peer}': {message}")]
    Media { peer: ParticipantId, message: String },

    #[error("already in a room")]
    AlreadyJoined,

    #[error("not in a room")]
    NotJoined,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("invalid server URL '{0}'")]
    InvalidUrl(String),

    #[error("logging error: {0}")]
    Logging(#[from] logging::LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn media(peer: &ParticipantId, message: impl ToString) -> Self {
        ClientError::Media {
            peer: peer.clone(),
            message: message.to_string(),
        }
    }
}
