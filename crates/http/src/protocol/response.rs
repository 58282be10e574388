//! HTTP response head handling implementation.
//!
//! A [`Response`] starts out empty when an exchange begins and is filled in by
//! the header decoder. The body is not part of it: it is pulled separately
//! through the exchange's body reader.

use http::{HeaderMap, StatusCode, Version, header};

use crate::utils::contains_ignore_ascii_case;

/// The status line and headers of an HTTP response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: Option<StatusCode>,
    status_message: String,
    version: Version,
    headers: HeaderMap,
}

impl Response {
    pub fn new(status: StatusCode, status_message: impl Into<String>, version: Version, headers: HeaderMap) -> Self {
        Self { status: Some(status), status_message: status_message.into(), version, headers }
    }

    /// The parsed status code, `None` until the status line has been read.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The numeric status code, `0` until the status line has been read.
    pub fn status_code(&self) -> u16 {
        self.status.map_or(0, |status| status.as_u16())
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// True when nothing has been parsed into this response yet.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.headers.is_empty()
    }

    /// Keep-alive as announced by the response headers.
    ///
    /// HTTP/1.1 keeps connections alive by default; any `Connection` value
    /// containing `close` (ASCII case-insensitive) turns it off.
    pub fn keep_alive(&self) -> bool {
        !self.headers.get_all(header::CONNECTION).iter().any(|value| contains_ignore_ascii_case(value.as_bytes(), b"close"))
    }

    /// Converts into an `http::Response` with the given body.
    pub fn into_http<T>(self, body: T) -> http::Response<T> {
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status.unwrap_or_default();
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }
}
