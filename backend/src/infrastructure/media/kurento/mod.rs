//! Media engine backed by a Kurento media server.

mod client;
mod engine;
mod rpc;

pub use engine::KurentoEngine;
