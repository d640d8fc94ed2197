//! Seams to the browser-side media stack and the presentation layer.

use signaling::{IceCandidate, LinkState, ParticipantId};

use crate::error::Result;

/// Which way media flows on a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDirection {
    /// The participant's own camera and microphone.
    SendOnly,
    /// Another participant's media.
    RecvOnly,
}

/// Local WebRTC stack: one peer connection per participant.
pub trait LocalMedia {
    /// Creates the peer connection for `peer` and returns its SDP offer.
    fn generate_offer(&mut self, peer: &ParticipantId, direction: MediaDirection) -> Result<String>;

    fn process_answer(&mut self, peer: &ParticipantId, sdp_answer: &str) -> Result<()>;

    fn add_ice_candidate(&mut self, peer: &ParticipantId, candidate: &IceCandidate) -> Result<()>;

    /// Tears down the peer connection. Unknown peers are ignored.
    fn dispose(&mut self, peer: &ParticipantId);
}

/// Presentation of the participants of the current room.
pub trait ParticipantView {
    fn add(&mut self, participant: &ParticipantId, is_local: bool);

    fn remove(&mut self, participant: &ParticipantId);

    fn state_changed(&mut self, _participant: &ParticipantId, _state: LinkState) {}
}
