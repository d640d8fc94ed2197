//! Application layer - signaling use cases and message routing

pub mod handlers;
pub mod session_context;
pub mod usecases;

pub use session_context::{Membership, SessionContext};
