//! Client connection handler: WebSocket handshake, then the read/flush loop.

use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use signaling::ServerMessage;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::{Message, WebSocket};

use crate::application::SessionContext;
use crate::application::handlers::MessageHandler;
use crate::infrastructure::session::SessionHandle;
use crate::ws::stream_type::StreamType;
use crate::ws::tls::accept_tls;

/// Read timeout while connected; bounds how long queued messages wait.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the handshake callback checks before upgrading.
pub(crate) struct Admission<'a> {
    pub path: &'a str,
    pub over_capacity: bool,
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

/// Client connection handler managing one signaling session
pub struct ClientHandler {
    socket: WebSocket<StreamType>,
    message_handler: MessageHandler,
    ctx: SessionContext,
    outbound: Receiver<ServerMessage>,
    peer_addr: SocketAddr,
    logger: logging::Logger,
}

impl ClientHandler {
    /// Runs the TLS (if enabled) and WebSocket handshakes.
    pub(crate) fn accept(
        stream: TcpStream,
        message_handler: MessageHandler,
        logger: logging::Logger,
        tls_acceptor: Option<Arc<native_tls::TlsAcceptor>>,
        admission: Admission<'_>,
    ) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let stream = match tls_acceptor {
            Some(acceptor) => {
                let tls_stream = accept_tls(stream, &acceptor).map_err(|e| {
                    logger.error(&format!("TLS handshake failed with {}: {}", peer_addr, e));
                    io::Error::other(e)
                })?;
                StreamType::Tls(Box::new(tls_stream))
            }
            None => StreamType::Plain(stream),
        };

        let callback = |request: &Request, response: Response| {
            if request.uri().path() != admission.path {
                return Err(reject(StatusCode::NOT_FOUND, "no signaling endpoint here"));
            }
            if admission.over_capacity {
                return Err(reject(StatusCode::SERVICE_UNAVAILABLE, "too many connections"));
            }
            Ok(response)
        };
        let socket = tungstenite::accept_hdr(stream, callback).map_err(|e| {
            logger.warn(&format!("WebSocket handshake refused for {}: {}", peer_addr, e));
            io::Error::new(ErrorKind::ConnectionRefused, e.to_string())
        })?;
        socket.get_ref().set_read_timeout(POLL_INTERVAL)?;

        let (session, outbound) = SessionHandle::channel();
        let ctx = SessionContext::new(session, logger.clone());

        Ok(ClientHandler {
            socket,
            message_handler,
            ctx,
            outbound,
            peer_addr,
            logger,
        })
    }

    /// Serves the session until the client goes away, then leaves its room.
    pub fn handle(&mut self) -> io::Result<()> {
        self.ctx
            .logger
            .info(&format!("New connection from {}", self.peer_addr));
        let result = self.run();
        self.message_handler.cleanup_disconnect(&mut self.ctx);
        self.drain_after_close();
        self.ctx
            .logger
            .info(&format!("Connection from {} closed", self.peer_addr));
        result
    }

    fn run(&mut self) -> io::Result<()> {
        loop {
            self.send_pending_messages()?;

            match self.socket.read() {
                Ok(Message::Text(text)) => {
                    if let Err(e) = self.message_handler.process_text(&mut self.ctx, &text) {
                        self.logger.info(&format!("Session ended: {}", e));
                        return Ok(());
                    }
                }
                Ok(Message::Binary(_)) => self.ctx.logger.warn("Ignoring binary frame"),
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(());
                }
                Err(e) => {
                    self.logger
                        .error(&format!("Failed to read from {}: {}", self.peer_addr, e));
                    return Err(io::Error::other(e.to_string()));
                }
            }
        }
    }

    /// Writes every queued server message.
    fn send_pending_messages(&mut self) -> io::Result<()> {
        let mut wrote = false;
        loop {
            match self.outbound.try_recv() {
                Ok(message) => {
                    self.ctx
                        .logger
                        .debug(&format!("Sending {}", message.kind()));
                    self.socket
                        .write(Message::Text(message.encode()))
                        .map_err(|e| io::Error::new(ErrorKind::BrokenPipe, e.to_string()))?;
                    wrote = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if wrote {
            self.socket
                .flush()
                .map_err(|e| io::Error::new(ErrorKind::BrokenPipe, e.to_string()))?;
        }
        Ok(())
    }

    /// Best-effort flush and close once the session is over.
    fn drain_after_close(&mut self) {
        let _ = self.send_pending_messages();
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}
