//! Stream type abstraction for plain and TLS connections.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Stream under a WebSocket, either plain TCP or TLS
pub(crate) enum StreamType {
    Plain(TcpStream),
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

impl StreamType {
    fn tcp(&self) -> &TcpStream {
        match self {
            StreamType::Plain(stream) => stream,
            StreamType::Tls(stream) => stream.get_ref(),
        }
    }

    pub(crate) fn set_read_timeout(&self, duration: Duration) -> io::Result<()> {
        self.tcp().set_read_timeout(Some(duration))
    }
}

impl Read for StreamType {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamType::Plain(stream) => stream.read(buf),
            StreamType::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for StreamType {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamType::Plain(stream) => stream.write(buf),
            StreamType::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamType::Plain(stream) => stream.flush(),
            StreamType::Tls(stream) => stream.flush(),
        }
    }
}
