//! Infrastructure - sessions, the room registry and the media engine

pub mod media;
pub mod registry;
pub mod session;
