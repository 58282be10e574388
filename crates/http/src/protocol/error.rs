use std::io;
use thiserror::Error;

use crate::protocol::{ExchangeState, Response};

/// Top-level error of an exchange.
///
/// Every variant is terminal: the exchange moves to [`ExchangeState::Failed`]
/// and its transport is released before the error is surfaced.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("invalid tls configuration: {reason}")]
    Tls { reason: String },

    #[error("connect to {host}:{port} failed: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("write request failed: {source}")]
    WriteFailed {
        #[from]
        source: SendError,
    },

    #[error("read response failed: {source}")]
    ReadFailed {
        #[source]
        source: ParseError,
    },

    #[error("malformed status line: {reason}")]
    MalformedStatusLine { reason: String },

    #[error("malformed response header: {source}")]
    MalformedHeader {
        #[source]
        source: ParseError,
    },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("exchange cancelled")]
    Cancelled,

    #[error("can't {operation} while exchange is {current:?}")]
    InvalidState { operation: &'static str, current: ExchangeState },
}

impl ExchangeError {
    pub fn invalid_request<S: ToString>(str: S) -> Self {
        Self::InvalidRequest { reason: str.to_string() }
    }

    pub fn tls<S: ToString>(str: S) -> Self {
        Self::Tls { reason: str.to_string() }
    }

    pub fn connect_failed<S: Into<String>>(host: S, port: u16, source: io::Error) -> Self {
        Self::ConnectFailed { host: host.into(), port, source }
    }

    pub fn invalid_state(operation: &'static str, current: ExchangeState) -> Self {
        Self::InvalidState { operation, current }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExchangeError::Cancelled)
    }
}

/// Routes decoder errors to the exchange error kind callers match on.
impl From<ParseError> for ExchangeError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::MalformedStatusLine { reason } => Self::MalformedStatusLine { reason },
            ParseError::InvalidVersion(version) => {
                Self::MalformedStatusLine { reason: format!("unsupported http version {version:?}") }
            }
            ParseError::InvalidContentLength { reason } => Self::InvalidContentLength { reason },
            e @ (ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } | ParseError::InvalidHeader { .. }) => {
                Self::MalformedHeader { source: e }
            }
            e @ (ParseError::InvalidBody { .. } | ParseError::Io { .. }) => Self::ReadFailed { source: e },
        }
    }
}

/// A failed exchange: the error plus whatever response state had been parsed.
///
/// The response is empty when the failure happened before the status line
/// was read.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExchangeFailure {
    #[source]
    pub error: ExchangeError,
    pub response: Response,
}

impl ExchangeFailure {
    pub fn new(error: ExchangeError, response: Response) -> Self {
        Self { error, response }
    }

    pub fn into_parts(self) -> (ExchangeError, Response) {
        (self.error, self.response)
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("malformed status line: {reason}")]
    MalformedStatusLine { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn malformed_status_line<S: ToString>(str: S) -> Self {
        Self::MalformedStatusLine { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn unexpected_eof<S: ToString>(str: S) -> Self {
        Self::Io { source: io::Error::new(io::ErrorKind::UnexpectedEof, str.to_string()) }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_route_to_exchange_kinds() {
        let e: ExchangeError = ParseError::malformed_status_line("HTTP/1.1 abc").into();
        assert!(matches!(e, ExchangeError::MalformedStatusLine { .. }));

        let e: ExchangeError = ParseError::invalid_content_length("value x is not u64").into();
        assert!(matches!(e, ExchangeError::InvalidContentLength { .. }));

        let e: ExchangeError = ParseError::too_many_headers(64).into();
        assert!(matches!(e, ExchangeError::MalformedHeader { .. }));

        let e: ExchangeError = ParseError::unexpected_eof("peer closed").into();
        assert!(matches!(e, ExchangeError::ReadFailed { .. }));

        let e: ExchangeError = ParseError::InvalidVersion(Some(0)).into();
        assert!(matches!(e, ExchangeError::MalformedStatusLine { .. }));
    }

    #[test]
    fn failure_displays_inner_error() {
        let failure = ExchangeFailure::new(ExchangeError::Cancelled, Response::default());
        assert_eq!(failure.to_string(), "exchange cancelled");
        assert!(failure.response.is_empty());
    }
}
