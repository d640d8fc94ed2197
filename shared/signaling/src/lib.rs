//! Group-call signaling protocol shared by the server and the client.
//!
//! Contains the JSON wire messages, identifier newtypes, the error taxonomy
//! both sides report, and the per-pair negotiation state machine.

mod candidate;
mod error;
mod ids;
mod message;
mod negotiation;

pub use candidate::IceCandidate;
pub use error::{ErrorReason, Result, SignalingError};
pub use ids::{ParticipantId, RoomId};
pub use message::{ClientMessage, DecodeError, ServerMessage};
pub use negotiation::{LinkState, PeerLink, TransitionError};
