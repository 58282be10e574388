//! HTTP header decoder implementation for parsing HTTP response heads
//!
//! This module decodes the status line and header block of a response from
//! raw bytes and decides how the body that follows is framed.
//!
//! # Features
//!
//! - Zero-copy header parsing using `httparse`
//! - Support for HTTP/1.0 and HTTP/1.1 responses
//! - Built-in protection against oversized header blocks
//! - Body framing selection from the status, the request method and the headers
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//!
//! # Implementation Details
//!
//! The decoder works in multiple stages:
//!
//! 1. Parse raw bytes using `httparse`
//! 2. Record header name/value byte ranges
//! 3. Split the header block off the buffer, leaving any body bytes behind
//! 4. Build the [`Response`] and pick its [`PayloadSize`]

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, Response};
use crate::utils::contains_ignore_ascii_case;

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// Responses to `HEAD` requests never carry a body whatever their headers
/// say, so the decoder has to know whether the request was a `HEAD`.
///
/// When decoding fails after the status line was parsed, the response built
/// so far is kept and can be taken with [`take_partial`](Self::take_partial).
#[derive(Debug, Clone, Default)]
pub struct HeaderDecoder {
    head_request: bool,
    partial: Option<Response>,
}

impl HeaderDecoder {
    pub fn new(head_request: bool) -> Self {
        Self { head_request, partial: None }
    }

    /// The response left behind by the last failed decode, if its status line parsed.
    pub fn take_partial(&mut self) -> Option<Response> {
        self.partial.take()
    }
}

impl Decoder for HeaderDecoder {
    type Item = (Response, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// On success exactly the header block is consumed; body bytes read along
    /// with it stay in `src`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The status line is malformed
    /// - The number of headers exceeds `MAX_HEADER_NUM`
    /// - The total header size exceeds `MAX_HEADER_BYTES`
    /// - Headers contain invalid characters
    /// - `Content-Length` is not a valid length
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Shortest valid head is "HTTP/1.1 200\r\n\r\n"
        if src.len() < 16 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let parsed_result = match res.parse(src) {
            Ok(status) => status,
            Err(e) => {
                // httparse fills in the status line before it looks at the headers
                self.partial = status_line(&res).ok();
                return Err(match e {
                    Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
                    Error::Status | Error::Version => ParseError::malformed_status_line(e.to_string()),
                    e => ParseError::invalid_header(e.to_string()),
                });
            }
        };

        match parsed_result {
            Status::Complete(body_offset) => {
                trace!(header_size = body_offset, "parsed response head");
                let mut response = status_line(&res)?;
                if body_offset > MAX_HEADER_BYTES {
                    self.partial = Some(response);
                    return Err(ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));
                }

                let header_count = res.headers.len();
                let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
                HeaderIndex::record(src, res.headers, &mut header_index);

                // Split header portion from source buffer
                let header_bytes = src.split_to(body_offset).freeze();

                let payload_size = append_headers(&mut response, &header_bytes, &header_index[..header_count])
                    .and_then(|()| parse_payload(&response, self.head_request));
                match payload_size {
                    Ok(payload_size) => Ok(Some((response, payload_size))),
                    Err(e) => {
                        self.partial = Some(response);
                        Err(e)
                    }
                }
            }
            // If parsing incomplete, ensure current buffer size does not exceed limit
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Builds a header-less [`Response`] from a parsed status line.
fn status_line(res: &httparse::Response<'_, '_>) -> Result<Response, ParseError> {
    let version = match res.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(ParseError::InvalidVersion(v)),
    };

    let code = res.code.ok_or_else(|| ParseError::malformed_status_line("missing status code"))?;
    let status = StatusCode::from_u16(code).map_err(|e| ParseError::malformed_status_line(format!("{code}: {e}")))?;
    let status_message = res.reason.unwrap_or_default().trim().to_string();

    Ok(Response::new(status, status_message, version, HeaderMap::new()))
}

/// Appends the recorded headers in order; on error the ones before stay appended.
fn append_headers(response: &mut Response, header_bytes: &Bytes, indices: &[HeaderIndex]) -> Result<(), ParseError> {
    let headers = response.headers_mut();
    headers.reserve(indices.len());
    for index in indices {
        let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
            .map_err(|e| ParseError::invalid_header(e.to_string()))?;
        let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
            .map_err(|e| ParseError::invalid_header(e.to_string()))?;

        headers.append(name, value);
    }
    Ok(())
}

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    /// Start and end byte positions of the header name
    pub(crate) name: (usize, usize),
    /// Start and end byte positions of the header value
    pub(crate) value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

/// Determines how the response body is framed.
///
/// In order of precedence:
/// - no body for `HEAD` requests and `1xx`, `204`, `304` responses
/// - chunked when `Transfer-Encoding` mentions `chunked`
/// - fixed length when `Content-Length` is present
/// - otherwise the body runs until the connection closes
///
/// # Errors
///
/// Returns `ParseError::InvalidContentLength` if `Content-Length` values are
/// not unsigned integers or disagree with each other.
fn parse_payload(response: &Response, head_request: bool) -> Result<PayloadSize, ParseError> {
    let status = response.status_code();
    if head_request || (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(PayloadSize::new_empty());
    }

    // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length
    let headers = response.headers();
    if is_chunked(headers.get_all(http::header::TRANSFER_ENCODING).iter()) {
        return Ok(PayloadSize::new_chunked());
    }

    let mut length = None;
    for cl_value in headers.get_all(http::header::CONTENT_LENGTH) {
        let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

        // a list like "5, 5" is tolerated as long as every element agrees
        for item in cl_str.split(',') {
            let item = item.trim();
            // 1*DIGIT only, `parse` alone would also take a leading `+`
            ensure!(
                !item.is_empty() && item.bytes().all(|b| b.is_ascii_digit()),
                ParseError::invalid_content_length(format!("value {item} is not digits"))
            );
            let value = item.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {item} is not u64")))?;
            match length {
                Some(previous) if previous != value => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {value}")));
                }
                _ => length = Some(value),
            }
        }
    }

    Ok(length.map_or_else(PayloadSize::new_close, PayloadSize::new_length))
}

/// Checks if any Transfer-Encoding value mentions chunked, ASCII case-insensitively.
fn is_chunked<'a>(mut values: impl Iterator<Item = &'a HeaderValue>) -> bool {
    values.any(|value| contains_ignore_ascii_case(value.as_bytes(), b"chunked"))
}
