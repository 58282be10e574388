//! Encoder dispatch for request bodies.
//!
//! The framing is fixed by the request head: the header encoder writes the
//! `Content-Length` or `Transfer-Encoding` header and this encoder writes the
//! body to match it.

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a request body with the framing its head declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    framing: Framing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Framing {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    /// `Content-Length: 0`, any data is rejected
    Empty,
}

impl PayloadEncoder {
    pub fn is_chunked(&self) -> bool {
        matches!(self.framing, Framing::Chunked(_))
    }

    /// True once the whole declared body, and for chunked framing the
    /// terminating chunk, has been written.
    pub fn is_finished(&self) -> bool {
        match &self.framing {
            Framing::Length(encoder) => encoder.is_finish(),
            Framing::Chunked(encoder) => encoder.is_finish(),
            Framing::Empty => true,
        }
    }
}

/// Requests can't be delimited by closing the connection: the client still
/// has to read the response from it.
impl TryFrom<PayloadSize> for PayloadEncoder {
    type Error = SendError;

    fn try_from(payload_size: PayloadSize) -> Result<Self, Self::Error> {
        let framing = match payload_size {
            PayloadSize::Length(0) | PayloadSize::Empty => Framing::Empty,
            PayloadSize::Length(size) => Framing::Length(LengthEncoder::new(size)),
            PayloadSize::Chunked => Framing::Chunked(ChunkedEncoder::new()),
            PayloadSize::Close => return Err(SendError::invalid_body("a request body can't be delimited by connection close")),
        };
        Ok(Self { framing })
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.framing {
            Framing::Length(encoder) => encoder.encode(item, dst),
            Framing::Chunked(encoder) => encoder.encode(item, dst),
            Framing::Empty => match item {
                PayloadItem::Chunk(bytes) if bytes.has_remaining() => {
                    Err(SendError::invalid_body(format!("body exceeds content-length by {} bytes", bytes.remaining())))
                }
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn framing_follows_payload_size() {
        assert!(PayloadEncoder::try_from(PayloadSize::new_chunked()).unwrap().is_chunked());
        assert!(!PayloadEncoder::try_from(PayloadSize::new_length(3)).unwrap().is_chunked());
        assert!(PayloadEncoder::try_from(PayloadSize::new_length(0)).unwrap().is_finished());
        assert!(PayloadEncoder::try_from(PayloadSize::new_close()).is_err());
    }

    #[test]
    fn length_body_finishes_at_declared_size() {
        let mut encoder = PayloadEncoder::try_from(PayloadSize::new_length(5)).unwrap();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        assert!(!encoder.is_finished());
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        assert!(encoder.is_finished());
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"hello");
    }

    #[test]
    fn empty_body_rejects_data() {
        let mut encoder = PayloadEncoder::try_from(PayloadSize::new_empty()).unwrap();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"x")), &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
