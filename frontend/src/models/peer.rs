//! One participant as seen from the local client.

use signaling::{LinkState, ParticipantId, PeerLink};

use crate::media::MediaDirection;

/// A participant in the current room and the negotiation of the peer
/// connection that carries its media (or, for the local participant, the
/// connection publishing our own media).
#[derive(Debug)]
pub struct Peer {
    pub id: ParticipantId,
    pub direction: MediaDirection,
    pub link: PeerLink,
}

impl Peer {
    pub fn new(id: ParticipantId, direction: MediaDirection) -> Self {
        Peer {
            id,
            direction,
            link: PeerLink::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.direction == MediaDirection::SendOnly
    }

    pub fn state(&self) -> LinkState {
        self.link.state()
    }
}
