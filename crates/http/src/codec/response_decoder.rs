//! HTTP response decoder module
//!
//! This module provides functionality for decoding HTTP responses using a streaming approach.
//! It handles both head parsing and payload decoding through a state machine pattern.
//!
//! # Components
//!
//! - [`ResponseDecoder`]: Main decoder that coordinates head and payload parsing
//! - Head parsing: Uses [`HeaderDecoder`] for the status line and headers
//! - Payload handling: Uses [`PayloadDecoder`] for the response body if any
//!
//! # Example
//!
//! ```no_run
//! use micro_http_client::codec::ResponseDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new();
//! let mut buffer = BytesMut::new();
//! // ... add response data to buffer ...
//! let result = decoder.decode(&mut buffer);
//! ```

use crate::codec::body::{DEFAULT_MAX_CHUNK_SIZE, PayloadDecoder};
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, Response};
use bytes::BytesMut;
use http::{Method, StatusCode};
use tokio_util::codec::Decoder;
use tracing::debug;

/// A decoder for HTTP responses that handles both the head and the payload
///
/// The decoder operates in two phases:
/// 1. Head parsing: Decodes the status line and headers using [`HeaderDecoder`]
/// 2. Payload parsing: If present, decodes the response body using [`PayloadDecoder`]
///
/// Interim `1xx` responses other than `101 Switching Protocols` are consumed
/// and skipped; only the final response head is yielded.
///
/// # State Machine
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing the head
/// - `Some(PayloadDecoder)`: Currently parsing payload
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    max_chunk_size: usize,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::default(), payload_decoder: None, max_chunk_size: DEFAULT_MAX_CHUNK_SIZE }
    }
}

impl ResponseDecoder {
    /// Creates a new `ResponseDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a decoder for the response to a request with the given method.
    ///
    /// Responses to `HEAD` never carry a body.
    pub fn for_request(method: &Method) -> Self {
        Self { header_decoder: HeaderDecoder::new(method == Method::HEAD), ..Self::default() }
    }

    /// Largest chunk accepted in a chunked body.
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// The response whose head failed to decode after its status line, if any.
    pub fn take_partial_response(&mut self) -> Option<Response> {
        self.header_decoder.take_partial()
    }

    /// The body decoder, present between the head and the end of the payload.
    pub fn payload_decoder(&self) -> Option<&PayloadDecoder> {
        self.payload_decoder.as_ref()
    }

    fn decode_payload(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<Message<(Response, PayloadSize)>>, ParseError> {
        let Some(payload_decoder) = &mut self.payload_decoder else {
            return Ok(None);
        };

        let item = if eof { payload_decoder.decode_eof(src)? } else { payload_decoder.decode(src)? };
        let message = match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof) => {
                // no need payload decoder in this response now
                self.payload_decoder.take();
                Some(Message::Payload(item))
            }
            None => None,
        };

        Ok(message)
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(Response, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode an HTTP response from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded the final response head
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // parse payload if have payload_decoder
        if self.payload_decoder.is_some() {
            return self.decode_payload(src, false);
        }

        // parse response head, skipping interim responses
        loop {
            match self.header_decoder.decode(src)? {
                Some((response, _)) if is_interim(&response) => {
                    debug!(status = response.status_code(), "skipped interim response");
                }
                Some((response, payload_size)) => {
                    self.payload_decoder = Some(match payload_size {
                        PayloadSize::Chunked => PayloadDecoder::chunked_with_limit(self.max_chunk_size),
                        payload_size => payload_size.into(),
                    });
                    return Ok(Some(Message::Header((response, payload_size))));
                }
                None => return Ok(None),
            }
        }
    }

    /// The peer closed the stream.
    ///
    /// A close-delimited body ends here; anywhere else this is a truncated response.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.payload_decoder.is_some() {
            return self.decode_payload(src, true);
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => Err(ParseError::unexpected_eof(format!("connection closed with {} bytes of incomplete response head", src.len()))),
        }
    }
}

fn is_interim(response: &Response) -> bool {
    response.status().is_some_and(|status| status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS)
}
