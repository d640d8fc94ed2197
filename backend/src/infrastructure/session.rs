//! Outbound half of a client connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::Arc;

use signaling::{ServerMessage, SignalingError};

/// Cloneable handle used by the rest of the server to reach one client.
///
/// Messages are queued on a channel and written by the connection's own
/// thread, so they reach the client in the order they were sent.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    sender: Sender<ServerMessage>,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Creates a handle and the receiver its connection drains.
    pub fn channel() -> (SessionHandle, Receiver<ServerMessage>) {
        let (sender, receiver) = channel();
        let handle = SessionHandle {
            id: rand::random::<u64>(),
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queues `message` for the client.
    ///
    /// # Errors
    ///
    /// `TransportClosed` once the session was closed or its connection is gone.
    pub fn send(&self, message: ServerMessage) -> Result<(), SignalingError> {
        if self.is_closed() {
            return Err(SignalingError::TransportClosed);
        }
        self.sender.send(message).map_err(|_| {
            self.closed.store(true, Ordering::Release);
            SignalingError::TransportClosed
        })
    }

    /// Marks the session closed. Returns `true` only for the first call.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}
