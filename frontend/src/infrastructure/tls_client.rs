use native_tls::TlsConnector;

use crate::error::Result;

/// Builds the connector used for `wss://` URLs.
///
/// With `accept_invalid_certs` the server certificate and hostname are not
/// validated, which is only meant for self-signed development servers.
pub fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_certs)
        .build()?;
    Ok(connector)
}
