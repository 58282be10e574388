use std::io;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};

use crate::client::ClientConfig;
use crate::protocol::ExchangeError;
use crate::transport::{Connect, Transport};

/// Opens plain TCP connections, or TLS ones when a CA certificate is configured.
#[derive(Clone)]
pub struct TransportConnector {
    tls: Option<TlsConnector>,
}

impl std::fmt::Debug for TransportConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnector").field("tls", &self.tls.is_some()).finish()
    }
}

impl TransportConnector {
    pub fn plain() -> Self {
        Self { tls: None }
    }

    /// Builds the connector for `config`, parsing its certificates.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Tls`] if a certificate or the key can't be parsed
    /// or rustls rejects them.
    pub fn new(config: &ClientConfig) -> Result<Self, ExchangeError> {
        let Some(ca_pem) = &config.ca_certificate else {
            return Ok(Self::plain());
        };

        let mut roots = RootCertStore::empty();
        for cert in CertificateDer::pem_slice_iter(ca_pem) {
            let cert = cert.map_err(|e| ExchangeError::tls(format!("invalid ca certificate: {e}")))?;
            roots.add(cert).map_err(|e| ExchangeError::tls(format!("rejected ca certificate: {e}")))?;
        }
        if roots.is_empty() {
            return Err(ExchangeError::tls("no ca certificate found in pem"));
        }

        let builder = rustls::ClientConfig::builder().with_root_certificates(roots);
        let tls_config = match &config.client_certificate {
            Some((cert_pem, key_pem)) => {
                let certs = CertificateDer::pem_slice_iter(cert_pem)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ExchangeError::tls(format!("invalid client certificate: {e}")))?;
                let key = PrivateKeyDer::from_pem_slice(key_pem).map_err(|e| ExchangeError::tls(format!("invalid client key: {e}")))?;
                builder.with_client_auth_cert(certs, key).map_err(|e| ExchangeError::tls(format!("rejected client certificate: {e}")))?
            }
            None => builder.with_no_client_auth(),
        };

        Ok(Self { tls: Some(TlsConnector::from(Arc::new(tls_config))) })
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}

impl Connect for TransportConnector {
    type Stream = Transport;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Transport> {
        // IPv6 literals keep their brackets in URIs
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let tcp_stream = TcpStream::connect((host, port)).await?;
        tcp_stream.set_nodelay(true)?;
        trace!(host, port, "tcp connected");

        let Some(connector) = &self.tls else {
            return Ok(Transport::Plain(tcp_stream));
        };

        let server_name =
            ServerName::try_from(host.to_string()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid server name {host}: {e}")))?;
        let tls_stream = connector.connect(server_name, tcp_stream).await?;
        debug!(host, port, "tls handshake finished");

        Ok(Transport::Tls(Box::new(tls_stream)))
    }
}
