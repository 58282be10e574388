use crate::codec::ResponseDecoder;
use crate::protocol::{BodyChunk, Message, ParseError, PayloadItem, PayloadSize, Response};
use bytes::{BufMut, BytesMut};
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

/// Reads a response head and then its body, chunk by chunk, from a stream.
///
/// Bytes read along with the header block stay in the receive buffer and
/// count towards the body.
#[derive(Debug)]
pub struct ResponseReader {
    buffer: BytesMut,
    decoder: ResponseDecoder,
    read_buffer_size: usize,
    finished: bool,
    discarded_spillover: bool,
}

impl ResponseReader {
    /// Creates a reader for the response to a request sent with `method`.
    pub fn with_capacity(method: &Method, buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(buffer_size),
            decoder: ResponseDecoder::for_request(method),
            read_buffer_size: buffer_size.max(1),
            finished: false,
            discarded_spillover: false,
        }
    }

    /// Largest chunk accepted in a chunked body; the whole chunk is buffered before it is handed out.
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.decoder = self.decoder.max_chunk_size(size);
        self
    }

    /// Bytes received but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True when bytes past the end of the body were received and dropped.
    ///
    /// The connection can't be reused after that.
    pub fn discarded_spillover(&self) -> bool {
        self.discarded_spillover
    }

    /// Declared body bytes still to be read from the stream.
    ///
    /// `None` before the head was read and for bodies without a declared
    /// length (chunked or close-delimited).
    pub fn body_length_left(&self) -> Option<u64> {
        if self.finished {
            return Some(0);
        }

        let remaining = self.decoder.payload_decoder()?.remaining_length()?;
        Some(remaining.saturating_sub(self.buffer.len() as u64))
    }

    /// The response left behind when [`read_head`](Self::read_head) failed
    /// after the status line was parsed.
    pub fn take_partial_response(&mut self) -> Option<Response> {
        self.decoder.take_partial_response()
    }

    /// Reads until the final response head is parsed.
    pub async fn read_head<R>(&mut self, reader: &mut R) -> Result<(Response, PayloadSize), ParseError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            match self.decoder.decode(&mut self.buffer)? {
                Some(Message::Header(head)) => return Ok(head),
                Some(Message::Payload(_)) => return Err(ParseError::invalid_body("received payload before response head")),
                None => {}
            }

            if self.read_more(reader).await? == 0 {
                return match self.decoder.decode_eof(&mut self.buffer)? {
                    Some(Message::Header(head)) => Ok(head),
                    _ => Err(ParseError::unexpected_eof("connection closed before response head")),
                };
            }
        }
    }

    /// Reads the next part of the body, performing I/O only when needed.
    ///
    /// - fixed length: reads `min(left, max_size - buffered)` more bytes, then
    ///   hands out everything buffered up to the declared length
    /// - chunked: hands out whole chunks until `max_size` is reached, reading
    ///   only while no complete chunk is buffered
    /// - close-delimited: hands out the buffer, or reads once up to `max_size`
    ///
    /// After the final chunk every call returns an empty final chunk.
    pub async fn read_body<R>(&mut self, reader: &mut R, max_size: usize) -> Result<BodyChunk, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        if self.finished {
            return Ok(BodyChunk::eof());
        }

        let Some(payload_decoder) = self.decoder.payload_decoder() else {
            return Err(ParseError::invalid_body("response head has not been read"));
        };

        if payload_decoder.is_fix_length() {
            let buffered = self.buffer.len() as u64;
            let left = self.body_length_left().unwrap_or(0);
            let to_read = left.min((max_size as u64).saturating_sub(buffered));
            trace!(buffered, left, to_read, "read fixed length body");

            let target = self.buffer.len() + to_read as usize;
            while self.buffer.len() < target {
                let want = target - self.buffer.len();
                if self.read_limited(reader, want).await? == 0 {
                    return Err(ParseError::unexpected_eof(format!("connection closed with {want} body bytes outstanding")));
                }
            }
            self.drain(usize::MAX)
        } else if payload_decoder.is_chunked() {
            loop {
                let chunk = self.drain(max_size.max(1))?;
                if !chunk.is_empty() || chunk.is_final {
                    return Ok(chunk);
                }

                if self.read_more(reader).await? == 0 {
                    return self.drain_eof();
                }
            }
        } else if payload_decoder.is_until_close() {
            if self.buffer.is_empty() && self.read_limited(reader, max_size.max(1)).await? == 0 {
                return self.drain_eof();
            }
            self.drain(usize::MAX)
        } else {
            self.drain(usize::MAX)
        }
    }

    /// Hands out decoded body bytes until `limit` is reached or more input is needed.
    fn drain(&mut self, limit: usize) -> Result<BodyChunk, ParseError> {
        let mut data = BytesMut::new();
        let mut is_final = false;

        while data.len() < limit {
            match self.decoder.decode(&mut self.buffer)? {
                Some(Message::Payload(PayloadItem::Chunk(bytes))) => data.extend_from_slice(&bytes),
                Some(Message::Payload(PayloadItem::Eof)) => {
                    is_final = true;
                    break;
                }
                Some(Message::Header(_)) => return Err(ParseError::invalid_body("received response head inside body")),
                None => break,
            }
        }

        if is_final {
            self.finish();
        }
        Ok(BodyChunk::new(data.freeze(), is_final))
    }

    fn drain_eof(&mut self) -> Result<BodyChunk, ParseError> {
        match self.decoder.decode_eof(&mut self.buffer)? {
            Some(Message::Payload(PayloadItem::Chunk(bytes))) => Ok(BodyChunk::new(bytes, false)),
            Some(Message::Payload(PayloadItem::Eof)) => {
                self.finish();
                Ok(BodyChunk::eof())
            }
            _ => Err(ParseError::unexpected_eof("connection closed inside response body")),
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if !self.buffer.is_empty() {
            warn!(size = self.buffer.len(), "discard bytes received past the end of the response body");
            self.buffer.clear();
            self.discarded_spillover = true;
        }
    }

    async fn read_more<R>(&mut self, reader: &mut R) -> Result<usize, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.reserve(self.read_buffer_size);
        let n = reader.read_buf(&mut self.buffer).await?;
        trace!(n, buffered = self.buffer.len(), "read from transport");
        Ok(n)
    }

    /// Reads at most `limit` bytes, whatever the spare capacity.
    async fn read_limited<R>(&mut self, reader: &mut R, limit: usize) -> Result<usize, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.reserve(limit.min(self.read_buffer_size));
        let mut limited = BufMut::limit(&mut self.buffer, limit);
        let n = reader.read_buf(&mut limited).await?;
        trace!(n, limit, buffered = self.buffer.len(), "read from transport");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tokio::io::AsyncWriteExt;

    async fn reader_after_head(raw: &[u8], method: Method) -> (ResponseReader, Response, PayloadSize) {
        let mut stream = raw;
        let mut reader = ResponseReader::with_capacity(&method, 8 * 1024);
        let (response, payload_size) = reader.read_head(&mut stream).await.unwrap();
        assert!(stream.is_empty());
        (reader, response, payload_size)
    }

    #[tokio::test]
    async fn spillover_counts_towards_length() {
        let (mut reader, response, payload_size) =
            reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello", Method::GET).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.status_message(), "OK");
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(reader.buffered(), 5);
        assert_eq!(reader.body_length_left(), Some(0));

        let mut stream: &[u8] = b"";
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"hello");
        assert!(chunk.is_final);
        assert_eq!(reader.body_length_left(), Some(0));

        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert!(chunk.is_empty());
        assert!(chunk.is_final);
    }

    #[tokio::test]
    async fn length_body_over_several_reads() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reader = ResponseReader::with_capacity(&Method::GET, 64);

        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123").await.unwrap();
        reader.read_head(&mut client).await.unwrap();
        assert_eq!(reader.body_length_left(), Some(6));

        server.write_all(b"456789").await.unwrap();

        let chunk = reader.read_body(&mut client, 7).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"0123456");
        assert!(!chunk.is_final);
        assert_eq!(reader.body_length_left(), Some(3));
        assert_eq!(reader.buffered(), 0);

        let chunk = reader.read_body(&mut client, 7).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"789");
        assert!(chunk.is_final);
        assert_eq!(reader.body_length_left(), Some(0));
    }

    #[tokio::test]
    async fn length_body_never_over_reads() {
        let (mut reader, _, _) = reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\n", Method::GET).await;

        let mut stream: &[u8] = b"abcNEXT";
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"abc");
        assert!(chunk.is_final);
        assert_eq!(stream, b"NEXT");
        assert!(!reader.discarded_spillover());
    }

    #[tokio::test]
    async fn body_length_left_is_non_increasing() {
        let (mut reader, _, _) = reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\nabcd", Method::GET).await;

        let mut previous = reader.body_length_left().unwrap();
        assert_eq!(previous, 8);

        let mut stream: &[u8] = b"efghijkl";
        let mut body = Vec::new();
        loop {
            let chunk = reader.read_body(&mut stream, 4).await.unwrap();
            body.extend_from_slice(&chunk.data);
            let left = reader.body_length_left().unwrap();
            assert!(left <= previous);
            previous = left;
            if chunk.is_final {
                break;
            }
        }
        assert_eq!(body, b"abcdefghijkl");
        assert_eq!(previous, 0);
    }

    #[tokio::test]
    async fn premature_eof_in_length_body() {
        let (mut reader, _, _) = reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc", Method::GET).await;

        let mut stream: &[u8] = b"";
        let result = reader.read_body(&mut stream, 1024).await;
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }

    #[tokio::test]
    async fn spillover_past_length_is_discarded() {
        let (mut reader, _, _) = reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokEXTRA", Method::GET).await;

        let mut stream: &[u8] = b"";
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"ok");
        assert!(chunk.is_final);
        assert!(reader.discarded_spillover());
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test]
    async fn chunked_body_hides_framing() {
        let raw = indoc! {r##"
        HTTP/1.1 200 OK
        Transfer-Encoding: chunked

        5;ext=1
        hello
        6
         world
        0
        X-Trailer: yes

        "##}
        .replace('\n', "\r\n");

        let (mut reader, _, payload_size) = reader_after_head(raw.as_bytes(), Method::GET).await;
        assert_eq!(payload_size, PayloadSize::Chunked);
        assert_eq!(reader.body_length_left(), None);

        let mut stream: &[u8] = b"";
        let chunk = reader.read_body(&mut stream, 3).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"hello");
        assert!(!chunk.is_final);

        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b" world");
        assert!(chunk.is_final);
        assert!(!reader.discarded_spillover());
    }

    #[tokio::test]
    async fn chunked_body_waits_for_whole_chunk() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let mut reader = ResponseReader::with_capacity(&Method::GET, 256);

        server.write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel").await.unwrap();
        reader.read_head(&mut client).await.unwrap();

        let pending = tokio::spawn(async move {
            let chunk = reader.read_body(&mut client, 1024).await.unwrap();
            (reader, client, chunk)
        });
        server.write_all(b"lo\r\n0\r\n\r\n").await.unwrap();

        let (mut reader, mut client, chunk) = pending.await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"hello");

        let chunk = reader.read_body(&mut client, 1024).await.unwrap();
        assert!(chunk.is_final);
    }

    #[tokio::test]
    async fn chunked_body_truncated() {
        let (mut reader, _, _) =
            reader_after_head(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel", Method::GET).await;

        let mut stream: &[u8] = b"";
        assert!(reader.read_body(&mut stream, 1024).await.is_err());
    }

    #[tokio::test]
    async fn close_delimited_body() {
        let (mut reader, _, payload_size) = reader_after_head(b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\nfirst", Method::GET).await;
        assert_eq!(payload_size, PayloadSize::Close);
        assert_eq!(reader.body_length_left(), None);

        let mut stream: &[u8] = b"second";
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"first");
        assert!(!chunk.is_final);

        let chunk = reader.read_body(&mut stream, 4).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"seco");

        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"nd");

        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert!(chunk.is_empty());
        assert!(chunk.is_final);
    }

    #[tokio::test]
    async fn head_and_no_content_responses_are_empty() {
        let mut stream: &[u8] = b"";

        let (mut reader, _, payload_size) = reader_after_head(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n", Method::HEAD).await;
        assert_eq!(payload_size, PayloadSize::Empty);
        assert_eq!(reader.body_length_left(), Some(0));
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert!(chunk.is_empty() && chunk.is_final);

        let (mut reader, _, payload_size) = reader_after_head(b"HTTP/1.1 204 No Content\r\n\r\n", Method::DELETE).await;
        assert_eq!(payload_size, PayloadSize::Empty);
        let chunk = reader.read_body(&mut stream, 1024).await.unwrap();
        assert!(chunk.is_empty() && chunk.is_final);
    }

    #[tokio::test]
    async fn eof_before_head() {
        let mut stream: &[u8] = b"HTTP/1.1 200 OK\r\n";
        let mut reader = ResponseReader::with_capacity(&Method::GET, 1024);
        assert!(matches!(reader.read_head(&mut stream).await, Err(ParseError::Io { .. })));

        let mut stream: &[u8] = b"";
        let mut reader = ResponseReader::with_capacity(&Method::GET, 1024);
        assert!(reader.read_head(&mut stream).await.is_err());
    }

    #[tokio::test]
    async fn body_before_head_is_rejected() {
        let mut stream: &[u8] = b"";
        let mut reader = ResponseReader::with_capacity(&Method::GET, 1024);
        assert!(reader.read_body(&mut stream, 1024).await.is_err());
    }

    #[tokio::test]
    async fn failed_head_leaves_partial_response() {
        let mut stream: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\nServer: x\r\nContent-Length: lots\r\n\r\n";
        let mut reader = ResponseReader::with_capacity(&Method::GET, 1024);

        assert!(matches!(reader.read_head(&mut stream).await, Err(ParseError::InvalidContentLength { .. })));
        let response = reader.take_partial_response().unwrap();
        assert_eq!(response.status_code(), 502);
        assert!(response.headers().contains_key("server"));
    }

    #[tokio::test]
    async fn chunk_over_limit_fails_without_buffering_it() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let mut reader = ResponseReader::with_capacity(&Method::GET, 256).max_chunk_size(1024);

        server.write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n").await.unwrap();
        reader.read_head(&mut client).await.unwrap();

        // the data never follows, the size line alone is enough to fail
        server.write_all(b"100000\r\n").await.unwrap();
        assert!(matches!(reader.read_body(&mut client, 1024).await, Err(ParseError::InvalidBody { .. })));
    }
}
