//! Connection to the signaling server

mod signaling_client;
mod tls_client;

pub use signaling_client::SignalingClient;
