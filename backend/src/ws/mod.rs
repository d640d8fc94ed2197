//! WebSocket endpoint carrying the JSON signaling protocol.

mod client_handler;
mod server;
mod stream_type;
pub mod tls;

pub use server::SignalingServer;
