//! TLS acceptor loading and server-side handshakes.

use native_tls::{Identity, TlsAcceptor, TlsStream};
use std::fs;
use std::net::TcpStream;
use std::sync::Arc;

use super::error::TlsError;

/// Load TLS server configuration from PKCS#12 file
///
/// # Arguments
/// * `pkcs12_path` - Path to the PKCS#12 certificate file
/// * `password` - Password to decrypt the certificate
pub fn load_tls_acceptor(pkcs12_path: &str, password: &str) -> Result<Arc<TlsAcceptor>, TlsError> {
    let identity_data = fs::read(pkcs12_path)
        .map_err(|e| TlsError::InvalidCertificate(format!("Cannot open {}: {}", pkcs12_path, e)))?;

    if identity_data.is_empty() {
        return Err(TlsError::InvalidCertificate(
            "Certificate file is empty".to_string(),
        ));
    }

    let identity = Identity::from_pkcs12(&identity_data, password)
        .map_err(|e| TlsError::InvalidCertificate(format!("Invalid PKCS#12 format: {}", e)))?;

    Ok(Arc::new(TlsAcceptor::new(identity)?))
}

/// Runs the server side of the TLS handshake on an accepted connection.
pub fn accept_tls(
    stream: TcpStream,
    acceptor: &TlsAcceptor,
) -> Result<TlsStream<TcpStream>, TlsError> {
    Ok(acceptor.accept(stream)?)
}
