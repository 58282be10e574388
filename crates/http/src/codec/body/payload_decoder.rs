//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for the framing strategies a response body can use:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads delimited by connection close
//! - Messages with no body
//!
//! The framing is picked by the header decoder from the response headers.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::close_decoder::CloseDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling HTTP message payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Decode payload until the peer closes the connection
    Close(CloseDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding accepting chunks of at most `max_chunk_size` bytes.
    pub fn chunked_with_limit(max_chunk_size: usize) -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::with_max_chunk_size(max_chunk_size)) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Creates a PayloadDecoder for a close-delimited payload.
    pub fn until_close() -> Self {
        Self { kind: Kind::Close(CloseDecoder::new()) }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::Close(_))
    }

    /// Returns true once the whole payload has been yielded.
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            Kind::Length(decoder) => decoder.is_finished(),
            Kind::Chunked(decoder) => decoder.is_finished(),
            Kind::Close(decoder) => decoder.is_finished(),
            Kind::NoBody => true,
        }
    }

    /// Bytes still to be yielded for a fixed-length payload, `None` for other framings.
    pub fn remaining_length(&self) -> Option<u64> {
        match &self.kind {
            Kind::Length(decoder) => Some(decoder.remaining()),
            Kind::NoBody => Some(0),
            Kind::Chunked(_) | Kind::Close(_) => None,
        }
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => PayloadDecoder::fix_length(length),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Close => PayloadDecoder::until_close(),
            PayloadSize::Empty => PayloadDecoder::empty(),
        }
    }
}

/// Implementation of the Decoder trait for HTTP payloads.
///
/// Delegates to the appropriate decoder based on the payload type.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::Close(close_decoder) => close_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode_eof(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode_eof(src),
            Kind::Close(close_decoder) => close_decoder.decode_eof(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_from_payload_size() {
        assert!(PayloadDecoder::from(PayloadSize::new_length(3)).is_fix_length());
        assert!(PayloadDecoder::from(PayloadSize::new_chunked()).is_chunked());
        assert!(PayloadDecoder::from(PayloadSize::new_close()).is_until_close());
        assert!(PayloadDecoder::from(PayloadSize::new_empty()).is_empty());
    }

    #[test]
    fn remaining_length_only_for_sized_bodies() {
        let mut decoder = PayloadDecoder::fix_length(5);
        assert_eq!(decoder.remaining_length(), Some(5));

        let mut buffer = BytesMut::from(&b"hel"[..]);
        decoder.decode(&mut buffer).unwrap();
        assert_eq!(decoder.remaining_length(), Some(2));

        assert_eq!(PayloadDecoder::chunked().remaining_length(), None);
        assert_eq!(PayloadDecoder::until_close().remaining_length(), None);
        assert_eq!(PayloadDecoder::empty().remaining_length(), Some(0));
    }

    #[test]
    fn chunked_limit_is_applied() {
        let mut decoder = PayloadDecoder::chunked_with_limit(4);
        assert!(decoder.is_chunked());

        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n"[..]);
        assert!(matches!(decoder.decode(&mut buffer), Err(ParseError::InvalidBody { .. })));
    }

    #[test]
    fn empty_body_is_finished_immediately() {
        let mut decoder = PayloadDecoder::empty();
        assert!(decoder.is_finished());
        assert!(decoder.decode(&mut BytesMut::new()).unwrap().unwrap().is_eof());
    }
}
