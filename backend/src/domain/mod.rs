//! Domain layer - room membership and per-leg negotiation state

mod link_key;
mod participant;
mod room;

pub use link_key::LinkKey;
pub use participant::Participant;
pub use room::{Admission, Removal, Room};
pub use signaling::{IceCandidate, LinkState, ParticipantId, PeerLink, RoomId};
