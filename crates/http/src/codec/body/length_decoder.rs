//! Decoder implementation for HTTP messages with Content-Length header.
//!
//! This module provides functionality to decode HTTP messages where the payload size
//! is specified by the Content-Length header, as defined in
//! [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112#section-6.2).

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder for handling HTTP messages with a known content length.
///
/// The decoder tracks the bytes not yet handed out and never yields more than
/// the declared length, whatever else sits in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of payload bytes not yet yielded
    length: u64,
}

impl LengthDecoder {
    /// `length` is the declared `Content-Length`.
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    /// Payload bytes still to be yielded (buffered or not yet read).
    pub fn remaining(&self) -> u64 {
        self.length
    }

    pub fn is_finished(&self) -> bool {
        self.length == 0
    }
}

/// Implementation of the Decoder trait for content-length based decoding.
impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes bytes from the input buffer according to the content length.
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Eof))` when all bytes have been read
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` when a chunk is successfully decoded
    /// * `Ok(None)` when more data is needed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // bytes past the declared length stay in `src`
        let len = usize::try_from(self.length).map_or(src.len(), |left| left.min(src.len()));
        let bytes = src.split_to(len).freeze();

        self.length -= bytes.len() as u64;
        trace!(len, remaining = self.length, "read length delimited bytes");
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::unexpected_eof(format!("connection closed with {} body bytes outstanding", self.length))),
        }
    }
}
