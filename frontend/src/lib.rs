//! Group call client core
//!
//! Joins a room on the signaling server, publishes the local media, and
//! subscribes to every other participant. Media negotiation and rendering
//! are delegated to [`LocalMedia`] and [`ParticipantView`]
//! implementations.

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logic;
pub mod media;
pub mod models;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use infrastructure::SignalingClient;
pub use logic::CallSession;
pub use media::{LocalMedia, MediaDirection, ParticipantView};
