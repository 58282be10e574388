//! Client configuration.

use crate::codec::DEFAULT_MAX_CHUNK_SIZE;

/// Default capacity of the response receive buffer
const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Default capacity of the request send buffer
const DEFAULT_WRITE_BUFFER_SIZE: usize = 4 * 1024;

/// Default upper bound of each segment of a chunked request body
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Settings shared by every exchange a client starts.
///
/// TLS is used when a CA certificate is configured, whatever the URI
/// scheme; the server certificate must chain to that CA.
///
/// ```
/// use micro_http_client::client::ClientConfig;
///
/// let config = ClientConfig::default().read_buffer_size(16 * 1024).chunk_size(1024);
/// assert!(!config.is_tls());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) ca_certificate: Option<Vec<u8>>,
    pub(crate) client_certificate: Option<(Vec<u8>, Vec<u8>)>,
    pub(crate) read_buffer_size: usize,
    pub(crate) write_buffer_size: usize,
    pub(crate) chunk_size: usize,
    pub(crate) max_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ca_certificate: None,
            client_certificate: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// PEM encoded CA certificate(s) the server certificate is verified against.
    pub fn ca_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_certificate = Some(pem.into());
        self
    }

    /// PEM encoded client certificate chain and private key, presented when the server asks.
    ///
    /// Only used together with [`ca_certificate`](Self::ca_certificate).
    pub fn client_certificate(mut self, cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        self.client_certificate = Some((cert_pem.into(), key_pem.into()));
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Upper bound of each segment when sending a chunked request body.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Largest chunk accepted in a chunked response body.
    ///
    /// Each chunk is buffered whole before it is handed out, so this bounds
    /// the memory one response can claim. Larger chunks fail the exchange.
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    pub fn is_tls(&self) -> bool {
        self.ca_certificate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.read_buffer_size, 8 * 1024);
        assert_eq!(config.write_buffer_size, 4 * 1024);
        assert_eq!(config.chunk_size, 8 * 1024);
        assert_eq!(config.max_chunk_size, 8 * 1024 * 1024);
        assert!(!config.is_tls());
    }

    #[test]
    fn sizes_are_never_zero() {
        let config = ClientConfig::new().read_buffer_size(0).chunk_size(0);
        assert_eq!(config.read_buffer_size, 1);
        assert_eq!(config.chunk_size, 1);
    }

    #[test]
    fn ca_certificate_turns_on_tls() {
        let config = ClientConfig::new().ca_certificate("-----BEGIN CERTIFICATE-----");
        assert!(config.is_tls());
    }
}
