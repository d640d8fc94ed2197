//! Seam to the external media engine that terminates every media leg.

pub mod kurento;

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{IceCandidate, LinkKey, RoomId};

pub use kurento::KurentoEngine;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media engine rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("media engine did not reply within {0:?}")]
    Timeout(Duration),

    #[error("media engine connection closed")]
    Closed,

    #[error("no media leg {leg} in room '{room}'")]
    UnknownLeg { room: RoomId, leg: LinkKey },

    #[error("media engine protocol error: {0}")]
    Protocol(String),

    #[error("media engine transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Something the engine reports on its own initiative.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Local candidate gathered for `leg`; belongs to the leg's viewer.
    IceCandidate {
        room: RoomId,
        leg: LinkKey,
        candidate: IceCandidate,
    },
    /// Media is flowing on `leg`.
    Connected { room: RoomId, leg: LinkKey },
}

/// Media server operations the signaling core relies on.
///
/// Implementations block; callers never invoke them with a room locked.
/// Engine events are delivered on the channel the engine was built with.
pub trait MediaEngine: Send + Sync {
    /// Negotiates `leg` and returns the SDP answer.
    fn process_offer(&self, room: &RoomId, leg: &LinkKey, sdp_offer: &str) -> MediaResult<String>;

    fn add_ice_candidate(
        &self,
        room: &RoomId,
        leg: &LinkKey,
        candidate: &IceCandidate,
    ) -> MediaResult<()>;

    /// Frees whatever the engine holds for `leg`. Unknown legs are ignored.
    fn release_leg(&self, room: &RoomId, leg: &LinkKey);

    /// Frees everything the engine holds for `room`.
    fn release_room(&self, room: &RoomId);
}
