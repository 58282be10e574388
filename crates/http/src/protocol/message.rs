//! Items flowing through the codecs and out of an exchange.

use bytes::{Buf, Bytes};

/// A message head followed by its payload items.
///
/// The request encoder consumes `Message<(RequestHead, PayloadSize)>` and the
/// response decoder produces `Message<(Response, PayloadSize)>`; `Data` is the
/// payload buffer type.
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// A slice of body data, or the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// How a message body is delimited on the wire.
///
/// - `Length`: exactly that many bytes follow the head
/// - `Chunked`: `Transfer-Encoding: chunked`
/// - `Close`: the body runs until the peer closes the connection, responses only
/// - `Empty`: no body at all, e.g. a `HEAD` or `204` response
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    Close,
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        PayloadSize::Length(length)
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_close() -> Self {
        PayloadSize::Close
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// A close-delimited body leaves the connection unusable for another exchange.
    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, PayloadSize::Close)
    }

    /// True when no body bytes follow the head.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// The chunk data, `None` for [`PayloadItem::Eof`].
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// One delivery of response body bytes to the caller.
///
/// `is_final` is set once the whole body has been delivered, after which
/// further reads yield empty final chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyChunk {
    pub data: Bytes,
    pub is_final: bool,
}

impl BodyChunk {
    pub fn new(data: Bytes, is_final: bool) -> Self {
        Self { data, is_final }
    }

    pub fn eof() -> Self {
        Self { data: Bytes::new(), is_final: true }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
