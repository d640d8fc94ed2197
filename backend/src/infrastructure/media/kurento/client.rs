//! Connection to the Kurento media server.
//!
//! A single I/O thread owns the WebSocket. Callers hand it requests over a
//! channel and block on a per-request reply channel with a timeout, the
//! same polling shape the signaling connections use.

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::rpc::{Incoming, KurentoEvent, RpcCall, parse_incoming, session_id};
use crate::infrastructure::media::{MediaError, MediaResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;
type Reply = Sender<MediaResult<Value>>;

enum Command {
    Request { call: RpcCall, reply: Reply },
    Shutdown,
}

/// Blocking JSON-RPC client for the Kurento API.
pub struct KurentoClient {
    commands: Sender<Command>,
    timeout: Duration,
}

impl KurentoClient {
    /// Connects to `uri` and starts the I/O thread. Events raised by media
    /// objects are forwarded to `events`.
    pub fn connect(
        uri: &str,
        timeout: Duration,
        events: Sender<KurentoEvent>,
        logger: logging::Logger,
    ) -> MediaResult<Self> {
        let (socket, _response) = tungstenite::connect(uri)?;
        set_read_timeout(&socket, POLL_INTERVAL)?;
        logger.info(&format!("Connected to media server at {}", uri));

        let (commands, receiver) = channel();
        let connection = Connection {
            socket,
            commands: receiver,
            events,
            pending: PendingRequests::new(timeout),
            next_id: 1,
            session_id: None,
            logger,
        };
        thread::Builder::new()
            .name("kurento-io".to_string())
            .spawn(move || connection.run())?;

        Ok(KurentoClient { commands, timeout })
    }

    /// Sends `call` and waits for its result.
    pub fn request(&self, call: RpcCall) -> MediaResult<Value> {
        let operation = call.method;
        let (reply, response) = channel();
        self.commands
            .send(Command::Request { call, reply })
            .map_err(|_| MediaError::Closed)?;

        match response.recv_timeout(self.timeout) {
            Ok(result) => result.map_err(|err| match err {
                MediaError::Rejected { message, .. } => MediaError::Rejected {
                    operation: operation.to_string(),
                    message,
                },
                other => other,
            }),
            Err(RecvTimeoutError::Timeout) => Err(MediaError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(MediaError::Closed),
        }
    }
}

impl Drop for KurentoClient {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

fn is_timeout(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::Io(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut
    )
}

/// Requests written to the socket and still waiting for a response.
///
/// Callers stop waiting after the request timeout, so entries older than
/// that are dropped even if the server never answers.
struct PendingRequests {
    replies: HashMap<u64, (Instant, Reply)>,
    timeout: Duration,
}

impl PendingRequests {
    fn new(timeout: Duration) -> Self {
        PendingRequests {
            replies: HashMap::new(),
            timeout,
        }
    }

    fn insert(&mut self, id: u64, reply: Reply, now: Instant) {
        self.replies.insert(id, (now, reply));
    }

    fn take(&mut self, id: u64) -> Option<Reply> {
        self.replies.remove(&id).map(|(_, reply)| reply)
    }

    /// Drops requests nobody waits for any more. Returns how many.
    fn expire(&mut self, now: Instant) -> usize {
        let before = self.replies.len();
        let timeout = self.timeout;
        self.replies
            .retain(|_, (sent, _)| now.saturating_duration_since(*sent) <= timeout);
        before - self.replies.len()
    }

    fn len(&self) -> usize {
        self.replies.len()
    }
}

struct Connection {
    socket: Socket,
    commands: Receiver<Command>,
    events: Sender<KurentoEvent>,
    pending: PendingRequests,
    next_id: u64,
    session_id: Option<String>,
    logger: logging::Logger,
}

impl Connection {
    fn run(mut self) {
        loop {
            if !self.send_pending_commands() {
                let _ = self.socket.close(None);
                let _ = self.socket.flush();
                return;
            }
            let expired = self.pending.expire(Instant::now());
            if expired > 0 {
                self.logger.warn(&format!(
                    "{} media server requests got no response in time ({} still pending)",
                    expired,
                    self.pending.len()
                ));
            }

            match self.socket.read() {
                Ok(Message::Text(text)) => self.handle_text(&text),
                Ok(Message::Close(_)) => {
                    self.logger.warn("Media server closed the connection");
                    return;
                }
                Ok(_) => {}
                Err(err) if is_timeout(&err) => {}
                Err(err) => {
                    self.logger
                        .error(&format!("Media server connection lost: {}", err));
                    return;
                }
            }
        }
    }

    /// Writes every queued request. Returns `false` once the client is gone.
    fn send_pending_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Request { call, reply }) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let text = call.encode(id, self.session_id.as_deref());
                    self.logger
                        .debug(&format!("-> {} #{}: {}", call.method, id, call.params));
                    match self.socket.send(Message::Text(text)) {
                        Ok(()) => {
                            self.pending.insert(id, reply, Instant::now());
                        }
                        Err(err) => {
                            let _ = reply.send(Err(MediaError::Transport(err)));
                        }
                    }
                }
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        match parse_incoming(text) {
            Ok(Incoming::Response { id, result }) => {
                if let Ok(value) = &result
                    && let Some(session) = session_id(value)
                {
                    self.session_id = Some(session.to_string());
                }
                match self.pending.take(id) {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => self
                        .logger
                        .warn(&format!("Response #{} matches no request", id)),
                }
            }
            Ok(Incoming::Event(event)) => {
                self.logger
                    .debug(&format!("<- {} on {}", event.kind, event.object));
                let _ = self.events.send(event);
            }
            Ok(Incoming::Other) => {}
            Err(err) => self
                .logger
                .warn(&format!("Ignoring media server frame: {}", err)),
        }
    }
}
