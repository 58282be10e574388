//! HTTP header encoder implementation for serializing HTTP request heads
//!
//! This module encodes a request head into raw bytes: the request line
//! followed by one `Name: Value` line per header and the empty line closing
//! the header block.
//!
//! # Features
//!
//! - `Host` always reflects the request URI host
//! - `Content-Length` or `Transfer-Encoding: chunked` set from the body framing
//! - HTTP/1.1 request lines only

use crate::protocol::{PayloadSize, RequestHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::{error, trace};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP request heads implementing the [`Encoder`] trait.
///
/// This encoder serializes a [`RequestHead`] and [`PayloadSize`] into raw bytes,
/// injecting the `Host` header and the framing header matching the payload size.
#[derive(Debug, Default)]
pub struct HeaderEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes an HTTP request head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - HTTP version is not supported (only HTTP/1.1 supported)
    /// - the request URI has no host
    /// - the payload size is close-delimited, which requests can't use
    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        let host = match head.host() {
            Some(host) => HeaderValue::from_str(host).map_err(|e| SendError::invalid_header(format!("invalid host: {e}")))?,
            None => return Err(SendError::invalid_header("request uri has no host")),
        };
        head.headers_mut().insert(header::HOST, host);

        dst.reserve(INIT_HEADER_SIZE);
        match head.version() {
            Version::HTTP_11 => {
                write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method().as_str(), head.target())?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        // Set appropriate content length or transfer encoding header
        match payload_size {
            PayloadSize::Length(n) => {
                head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                if !head.is_chunked() {
                    head.headers_mut().insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
                }
                head.headers_mut().remove(header::CONTENT_LENGTH);
            }
            PayloadSize::Empty => {
                const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                head.headers_mut().insert(header::CONTENT_LENGTH, ZERO_VALUE);
            }
            PayloadSize::Close => {
                return Err(SendError::invalid_body("a request body can't be delimited by connection close"));
            }
        }

        // Write all headers
        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        trace!(header_size = dst.len(), "encoded request head");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
