//! Client-side models

mod peer;

pub use peer::Peer;
