//! Group call signaling server library
//!
//! Core library exposing the room registry, signaling router and
//! WebSocket endpoint for the binary and for integration testing.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ws;

// Re-export commonly used types for integration tests
pub use application::handlers::MessageHandler;
pub use application::{Membership, SessionContext};
pub use config::GroupCallConfig;
pub use domain::{LinkKey, Room};
pub use infrastructure::media::{KurentoEngine, MediaEngine, MediaError, MediaEvent, MediaResult};
pub use infrastructure::registry::{Departure, RoomRegistry};
pub use infrastructure::session::SessionHandle;
pub use ws::SignalingServer;
