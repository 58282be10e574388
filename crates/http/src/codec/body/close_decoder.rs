//! Decoder for response bodies delimited by connection close.
//!
//! Used when a response declares neither `Transfer-Encoding: chunked` nor
//! `Content-Length` ([RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3), rule 8):
//! every byte up to end-of-stream belongs to the body.

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseDecoder {
    eof: bool,
}

impl CloseDecoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    /// Returns true once the peer closed the stream and the buffer was drained.
    pub fn is_finished(&self) -> bool {
        self.eof
    }
}

impl Decoder for CloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.eof {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    /// End of stream is the only way this body ends, so it is never an error here.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            return self.decode(src);
        }

        if !self.eof {
            trace!("peer closed the connection, close-delimited body finished");
        }
        self.eof = true;
        Ok(Some(PayloadItem::Eof))
    }
}
