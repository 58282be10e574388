//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module decodes response bodies sent with chunked transfer encoding
//! as specified in [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//!
//! The decoder works line by line: a size line is consumed only once its
//! CRLF is buffered, and chunk data is yielded only once all of its bytes
//! are buffered. Extensions and trailer fields are consumed and dropped.

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Longest size or trailer line accepted, CRLF included.
const MAX_LINE_SIZE: usize = 4 * 1024;

/// Largest chunk accepted unless configured otherwise.
pub(crate) const DEFAULT_MAX_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk, optional trailer fields and an empty line end the body
///
/// A chunk is only yielded once all of its data is buffered, so a size line
/// declaring more than `max_chunk_size` bytes is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    max_chunk_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Waiting for a size line
    Size,
    /// Waiting for the whole data of a chunk
    Data(u64),
    /// Waiting for the CRLF closing chunk data
    DataEnd,
    /// Skipping trailer fields up to the empty line
    Trailer,
    /// The last chunk was consumed
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self { state: ChunkedState::Size, max_chunk_size: max_chunk_size as u64 }
    }

    /// Returns true once the zero-size chunk and trailer section were consumed.
    pub fn is_finished(&self) -> bool {
        self.state == ChunkedState::End
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when a whole chunk is decoded
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk is processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    let size = parse_size_line(&line)?;
                    trace!(size, "read chunk size line");
                    ensure!(
                        size <= self.max_chunk_size,
                        ParseError::invalid_body(format!("chunk size {size} exceeds limit {}", self.max_chunk_size))
                    );
                    self.state = if size == 0 { ChunkedState::Trailer } else { ChunkedState::Data(size) };
                }

                ChunkedState::Data(size) => {
                    // a chunk larger than the address space can never be buffered whole
                    let Ok(size) = usize::try_from(size) else {
                        return Err(ParseError::invalid_body("chunk size exceeds addressable memory"));
                    };
                    if src.len() < size {
                        return Ok(None);
                    }

                    let chunk = src.split_to(size).freeze();
                    self.state = ChunkedState::DataEnd;
                    trace!(len = chunk.len(), "read whole chunk");
                    return Ok(Some(PayloadItem::Chunk(chunk)));
                }

                ChunkedState::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("chunk data is not followed by CRLF"));
                    src.advance(2);
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        self.state = ChunkedState::End;
                    } else {
                        trace!(len = line.len(), "skip trailer field");
                    }
                }

                ChunkedState::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }
            }
        }
    }

    /// The peer closed the stream: anything short of the terminating chunk is truncation.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::unexpected_eof("connection closed before the last chunk")),
        }
    }
}

/// Splits one CRLF terminated line off `src`, without its terminator.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    let Some(lf) = src.iter().position(|&b| b == b'\n') else {
        ensure!(src.len() < MAX_LINE_SIZE, ParseError::invalid_body("chunk line too long"));
        return Ok(None);
    };
    ensure!(lf < MAX_LINE_SIZE, ParseError::invalid_body("chunk line too long"));
    ensure!(lf > 0 && src[lf - 1] == b'\r', ParseError::invalid_body("chunk line must end with CRLF"));

    let mut line = src.split_to(lf + 1);
    line.truncate(lf - 1);
    Ok(Some(line))
}

/// Parses `size [ws] [; extensions]`, dropping the extensions.
fn parse_size_line(line: &[u8]) -> Result<u64, ParseError> {
    let digits = match line.iter().position(|&b| b == b';') {
        Some(semicolon) => &line[..semicolon],
        None => line,
    };
    let digits = digits.trim_ascii_end();

    ensure!(!digits.is_empty(), ParseError::invalid_body("missing chunk size"));
    ensure!(digits.iter().all(u8::is_ascii_hexdigit), ParseError::invalid_body("invalid chunk size"));

    digits.iter().try_fold(0u64, |size, &b| {
        // is_ascii_hexdigit was checked above
        let digit = u64::from((b as char).to_digit(16).unwrap_or_default());
        size.checked_mul(16).and_then(|size| size.checked_add(digit)).ok_or_else(|| ParseError::invalid_body("chunk size overflows"))
    })
}
