use crate::codec::RequestEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, RequestHead, SendError};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

type RequestMessage = Message<(RequestHead, PayloadSize), Bytes>;

/// Buffers an encoded request and writes it to a stream.
///
/// The stream is passed to [`flush`](Self::flush) rather than owned, so the
/// exchange can read the response from the same stream afterwards.
#[derive(Debug)]
pub struct RequestWriter {
    buffer: BytesMut,
    encoder: RequestEncoder,
    chunk_size: usize,
}

impl RequestWriter {
    /// `chunk_size` bounds each segment of a body sent with chunked framing.
    pub fn with_capacity(buffer_size: usize, chunk_size: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(buffer_size), encoder: RequestEncoder::new(), chunk_size: chunk_size.max(1) }
    }

    pub fn clear_buf(&mut self) {
        self.buffer.clear();
    }

    /// Bytes encoded but not yet flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn write_head(&mut self, head: RequestHead, payload_size: PayloadSize) -> Result<(), SendError> {
        self.write(Message::Header((head, payload_size)))
    }

    /// Encodes the whole body followed by the end-of-body marker.
    ///
    /// Chunked bodies are split into segments of at most `chunk_size` bytes;
    /// an empty chunked body still produces the terminating chunk.
    pub fn write_body(&mut self, mut body: Bytes) -> Result<(), SendError> {
        if self.encoder.is_chunked() {
            while body.has_remaining() {
                let segment = body.split_to(self.chunk_size.min(body.len()));
                trace!(size = segment.len(), "encode body segment");
                self.write(Message::Payload(PayloadItem::Chunk(segment)))?;
            }
        } else if body.has_remaining() {
            self.write(Message::Payload(PayloadItem::Chunk(body)))?;
        }

        self.write(Message::Payload(PayloadItem::Eof))
    }

    #[inline]
    fn write(&mut self, item: RequestMessage) -> Result<(), SendError> {
        self.encoder.encode(item, &mut self.buffer)
    }

    #[inline]
    pub async fn flush<W>(&mut self, writer: &mut W) -> Result<(), SendError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.buffer.is_empty() {
            return Ok(());
        }

        writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        Ok(writer.flush().await?)
    }
}
