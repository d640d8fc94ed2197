//! TLS error types.

use native_tls::HandshakeError;
use std::io;
use std::net::TcpStream;
use thiserror::Error;

/// TLS configuration or handshake error
#[derive(Debug, Error)]
pub enum TlsError {
    /// IO error reading certificate file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or corrupted certificate
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Native TLS library error
    #[error("TLS error: {0}")]
    NativeTls(#[from] native_tls::Error),

    /// TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
}

impl From<HandshakeError<TcpStream>> for TlsError {
    fn from(err: HandshakeError<TcpStream>) -> Self {
        TlsError::Handshake(err.to_string())
    }
}
