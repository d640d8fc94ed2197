//! WebSocket server for group-call signaling.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::application::handlers::MessageHandler;
use crate::config::ServerConfig;
use crate::ws::client_handler::{Admission, ClientHandler};
use crate::ws::tls::{TlsError, load_tls_acceptor};

/// Counts a live connection until dropped.
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Takes a slot and reports whether the limit was already reached.
    fn acquire(active: &Arc<AtomicUsize>, limit: usize) -> (Self, bool) {
        let previous = active.fetch_add(1, Ordering::AcqRel);
        let slot = ConnectionSlot {
            active: Arc::clone(active),
        };
        (slot, previous >= limit)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Signaling server accepting one thread per WebSocket connection, with
/// optional TLS support
pub struct SignalingServer {
    message_handler: MessageHandler,
    config: ServerConfig,
    logger: logging::Logger,
    tls_acceptor: Option<Arc<native_tls::TlsAcceptor>>,
    active: Arc<AtomicUsize>,
}

impl SignalingServer {
    pub fn new(message_handler: MessageHandler, config: ServerConfig, logger: logging::Logger) -> Self {
        SignalingServer {
            message_handler,
            config,
            logger,
            tls_acceptor: None,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enable TLS with the given PKCS#12 file and password
    pub fn with_tls(mut self, pkcs12_path: &str, password: &str) -> Result<Self, TlsError> {
        let acceptor = load_tls_acceptor(pkcs12_path, password)?;
        self.logger
            .info(&format!("TLS enabled with certificate: {}", pkcs12_path));
        self.tls_acceptor = Some(acceptor);
        Ok(self)
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Binds the configured address and serves forever.
    pub fn start(&self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr())?;
        self.serve(listener)
    }

    /// Serves connections accepted on `listener`.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let local_addr: SocketAddr = listener.local_addr()?;
        let scheme = if self.tls_acceptor.is_some() { "wss" } else { "ws" };
        self.logger.info(&format!(
            "Signaling server listening on {}://{}{}",
            scheme, local_addr, self.config.path
        ));

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let (slot, over_capacity) =
                        ConnectionSlot::acquire(&self.active, self.config.max_connections);
                    let message_handler = self.message_handler.clone();
                    let logger = self.logger.for_component("ClientHandler");
                    let tls_acceptor = self.tls_acceptor.clone();
                    let path = self.config.path.clone();

                    let spawned = thread::Builder::new()
                        .name("ws-client".to_string())
                        .spawn(move || {
                            let _slot = slot;
                            let admission = Admission {
                                path: &path,
                                over_capacity,
                            };
                            match ClientHandler::accept(
                                stream,
                                message_handler,
                                logger.clone(),
                                tls_acceptor,
                                admission,
                            ) {
                                Ok(mut handler) => {
                                    if let Err(e) = handler.handle() {
                                        logger.error(&format!("Client handler error: {}", e));
                                    }
                                }
                                Err(e) => {
                                    logger.warn(&format!("Connection not accepted: {}", e));
                                }
                            }
                        });
                    if let Err(e) = spawned {
                        self.logger
                            .error(&format!("Failed to spawn client thread: {}", e));
                    }
                }
                Err(e) => {
                    self.logger
                        .error(&format!("Failed to accept connection: {}", e));
                }
            }
        }

        Ok(())
    }
}
