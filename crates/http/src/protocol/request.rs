//! HTTP request header handling implementation.
//!
//! This module wraps the standard `http::Request` head with the helpers the
//! exchange needs before anything is written: connection target, request
//! target and the body framing the head declares.

use http::request::Parts;
use http::uri::Scheme;
use http::{HeaderMap, Method, Request, Uri, Version, header};

use crate::protocol::PayloadSize;
use crate::utils::contains_ignore_ascii_case;

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Represents an HTTP request head, i.e. a request without its body.
#[derive(Debug)]
pub struct RequestHead {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHead {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHead {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHead {
    /// Consumes the head and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this head, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// The host to connect to, taken from the request URI.
    pub fn host(&self) -> Option<&str> {
        self.uri().host()
    }

    /// The port to connect to: explicit URI port, else the scheme default.
    pub fn port(&self) -> u16 {
        self.uri().port_u16().unwrap_or_else(|| match self.uri().scheme() {
            Some(scheme) if *scheme == Scheme::HTTPS => DEFAULT_HTTPS_PORT,
            _ => DEFAULT_HTTP_PORT,
        })
    }

    /// The request-target written on the request line, `/` when the URI has no path.
    pub fn target(&self) -> &str {
        match self.uri().path_and_query() {
            Some(path_and_query) if !path_and_query.as_str().is_empty() => path_and_query.as_str(),
            _ => "/",
        }
    }

    /// Whether the caller already declared a chunked `Transfer-Encoding`.
    pub fn is_chunked(&self) -> bool {
        self.headers().get_all(header::TRANSFER_ENCODING).iter().any(|value| contains_ignore_ascii_case(value.as_bytes(), b"chunked"))
    }

    /// The framing used to send a body of `body_len` bytes with this head.
    pub fn payload_size(&self, body_len: usize) -> PayloadSize {
        if self.is_chunked() { PayloadSize::new_chunked() } else { PayloadSize::new_length(body_len as u64) }
    }
}

/// Converts request parts into a RequestHead.
impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHead.
impl From<Request<()>> for RequestHead {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(uri: &str) -> RequestHead {
        RequestHead::from(Request::get(uri).body(()).unwrap())
    }

    #[test]
    fn port_defaults_follow_scheme() {
        assert_eq!(head("http://example.com/").port(), 80);
        assert_eq!(head("https://example.com/").port(), 443);
        assert_eq!(head("https://example.com:8443/").port(), 8443);
    }

    #[test]
    fn target_keeps_query_and_defaults_to_root() {
        assert_eq!(head("http://example.com/a/b?x=1").target(), "/a/b?x=1");
        assert_eq!(head("http://example.com").target(), "/");
    }

    #[test]
    fn chunked_detection_is_case_insensitive() {
        let request = Request::post("http://example.com/").header("transfer-encoding", "gzip, Chunked").body(()).unwrap();
        let head = RequestHead::from(request);
        assert!(head.is_chunked());
        assert_eq!(head.payload_size(3), PayloadSize::Chunked);

        let head = self::head("http://example.com/");
        assert!(!head.is_chunked());
        assert_eq!(head.payload_size(3), PayloadSize::Length(3));
    }
}
