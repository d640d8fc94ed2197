//! Blocking WebSocket connection to the signaling server.

use std::io;
use std::net::TcpStream;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use signaling::{ClientMessage, DecodeError, ServerMessage, SignalingError};
use tungstenite::http::Uri;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Connector, Message, WebSocket};

use super::tls_client::tls_connector;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::logic::CallSession;
use crate::media::{LocalMedia, ParticipantView};

/// How long [`SignalingClient::poll`] waits for a frame.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SignalingClient {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    logger: logging::Logger,
}

impl SignalingClient {
    /// Connects as [`SignalingClient::connect`] does, logging to the file
    /// named in `config`.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let logger = config.logger()?;
        Self::connect(config, logger)
    }

    /// Opens the WebSocket described by `config.server_url`.
    pub fn connect(config: &ClientConfig, logger: logging::Logger) -> Result<Self> {
        let uri: Uri = config
            .server_url
            .parse()
            .map_err(|_| ClientError::InvalidUrl(config.server_url.clone()))?;
        let host = uri
            .host()
            .ok_or_else(|| ClientError::InvalidUrl(config.server_url.clone()))?;
        let port = uri
            .port_u16()
            .unwrap_or(if config.is_secure() { 443 } else { 80 });

        let stream = TcpStream::connect((host, port))?;
        let poll_handle = stream.try_clone()?;
        let connector = if config.is_secure() {
            Some(Connector::NativeTls(tls_connector(config.accept_invalid_certs)?))
        } else {
            Some(Connector::Plain)
        };

        let (socket, _response) =
            tungstenite::client_tls_with_config(config.server_url.as_str(), stream, None, connector)
                .map_err(|e| match e {
                    tungstenite::HandshakeError::Failure(err) => ClientError::WebSocket(err),
                    tungstenite::HandshakeError::Interrupted(_) => {
                        ClientError::Io(io::Error::from(io::ErrorKind::WouldBlock))
                    }
                })?;

        // Same socket as the stream handed to the handshake.
        poll_handle.set_read_timeout(Some(POLL_INTERVAL))?;

        logger.info(&format!("Connected to {}", config.server_url));
        Ok(SignalingClient { socket, logger })
    }

    pub fn send(&mut self, message: &ClientMessage) -> Result<()> {
        self.logger.debug(&format!("Sending {}", message.kind()));
        self.socket.send(Message::Text(message.encode()))?;
        Ok(())
    }

    /// Waits briefly for the next server message.
    ///
    /// Returns `Ok(None)` when nothing arrived in time or the frame was not
    /// a message this client understands.
    pub fn poll(&mut self) -> Result<Option<ServerMessage>> {
        let frame = match self.socket.read() {
            Ok(frame) => frame,
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(None);
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Err(SignalingError::TransportClosed.into());
            }
            Err(e) => return Err(e.into()),
        };

        match frame {
            Message::Text(text) => match ServerMessage::decode(&text) {
                Ok(message) => Ok(Some(message)),
                Err(DecodeError::UnknownKind(kind)) => {
                    self.logger.warn(&format!("Ignoring unknown message '{}'", kind));
                    Ok(None)
                }
                Err(DecodeError::Malformed(reason)) => {
                    self.logger.warn(&format!("Ignoring malformed message: {}", reason));
                    Ok(None)
                }
            },
            Message::Close(_) => Err(SignalingError::TransportClosed.into()),
            _ => Ok(None),
        }
    }

    /// Sends everything queued in `outbox`, then applies at most one
    /// server message to `session`.
    ///
    /// Only transport failures are returned; a message the session
    /// refuses is logged.
    pub fn pump<M: LocalMedia, V: ParticipantView>(
        &mut self,
        session: &mut CallSession<M, V>,
        outbox: &Receiver<ClientMessage>,
    ) -> Result<()> {
        while let Ok(message) = outbox.try_recv() {
            self.send(&message)?;
        }
        if let Some(message) = self.poll()? {
            let kind = message.kind();
            if let Err(e) = session.handle(message) {
                self.logger.warn(&format!("{} not applied: {}", kind, e));
            }
        }
        Ok(())
    }

    pub fn close(mut self) {
        if let Err(e) = self.socket.close(None) {
            self.logger.debug(&format!("Close failed: {}", e));
            return;
        }
        // Drain until the server acknowledges the close.
        while self.socket.read().is_ok() {}
        self.logger.info("Disconnected");
    }
}
