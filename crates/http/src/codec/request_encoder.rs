//! HTTP request encoder module
//!
//! Serializes a request head followed by its payload, choosing the payload
//! encoder from the framing the head declares.

use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// An encoder for HTTP requests that handles both the head and the payload
///
/// A [`Message::Header`] must come first; it selects the payload encoder that
/// the following [`Message::Payload`] items go through, up to and including
/// the final `Eof`.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// True while a head has been encoded and its payload is not finished.
    pub fn is_sending_payload(&self) -> bool {
        self.payload_encoder.is_some()
    }

    /// True when the pending payload goes out with chunked framing.
    pub fn is_chunked(&self) -> bool {
        self.payload_encoder.as_ref().is_some_and(PayloadEncoder::is_chunked)
    }
}

impl<D: Buf> Encoder<Message<(RequestHead, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                let payload_encoder = PayloadEncoder::try_from(payload_size)?;
                self.header_encoder.encode((head, payload_size), dst)?;
                self.payload_encoder = Some(payload_encoder);
                Ok(())
            }

            Message::Payload(payload_item) => {
                let payload_encoder = if let Some(encoder) = &mut self.payload_encoder {
                    encoder
                } else {
                    error!("expect request head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);

                if is_eof {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadItem;
    use bytes::Bytes;
    use http::Request;

    type Item = Message<(RequestHead, PayloadSize), Bytes>;

    fn head(request: Request<()>) -> Item {
        let head = RequestHead::from(request);
        let payload_size = head.payload_size(3);
        Message::Header((head, payload_size))
    }

    #[test]
    fn length_framed_request() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(head(Request::post("http://localhost/echo").body(()).unwrap()), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst).unwrap();

        let encoded = String::from_utf8(dst.to_vec()).unwrap();
        assert!(encoded.starts_with("POST /echo HTTP/1.1\r\n"));
        assert!(encoded.contains("content-length: 3\r\n"));
        assert!(encoded.ends_with("\r\n\r\nabc"));
        assert!(!encoder.is_sending_payload());
    }

    #[test]
    fn chunked_request() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        let request = Request::post("http://localhost/upload").header("Transfer-Encoding", "chunked").body(()).unwrap();
        encoder.encode(head(request), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst).unwrap();
        assert!(encoder.is_sending_payload());
        encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst).unwrap();

        let encoded = String::from_utf8(dst.to_vec()).unwrap();
        assert!(encoded.ends_with("\r\n\r\n3\r\nabc\r\n0\r\n\r\n"));
        assert!(!encoded.contains("content-length"));
    }

    #[test]
    fn payload_before_head_is_rejected() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        let result = encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst);
        assert!(result.is_err());
    }

    #[test]
    fn close_framing_is_rejected() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        let head = RequestHead::from(Request::get("http://localhost/").body(()).unwrap());
        let result = encoder.encode(Item::Header((head, PayloadSize::Close)), &mut dst);
        assert!(matches!(result, Err(SendError::InvalidBody { .. })));
        assert!(dst.is_empty());
    }
}
