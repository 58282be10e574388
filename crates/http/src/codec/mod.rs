//! HTTP codec module for encoding requests and decoding responses
//!
//! This module provides the client side of streaming HTTP/1.1 message
//! processing. It uses a state machine pattern to handle both heads and
//! payload data.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestEncoder`]: Encodes outgoing HTTP requests
//!   - Head encoding via the `header` module
//!   - Payload encoding via the `body` module
//!
//! - Response handling:
//!   - [`ResponseDecoder`]: Decodes incoming HTTP responses
//!   - Head parsing via the `header` module
//!   - Payload decoding via the `body` module
//!
//! # Example
//!
//! ```no_run
//! use micro_http_client::codec::{RequestEncoder, ResponseDecoder};
//! use micro_http_client::protocol::{Message, PayloadSize, RequestHead};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::{Bytes, BytesMut};
//!
//! // Encode outgoing request
//! let mut encoder = RequestEncoder::new();
//! let mut request_buffer = BytesMut::new();
//! let head = RequestHead::from(http::Request::get("http://localhost/").body(()).unwrap());
//! encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::Empty)), &mut request_buffer).unwrap();
//!
//! // Decode incoming response
//! let mut decoder = ResponseDecoder::new();
//! let mut response_buffer = BytesMut::new();
//! let response = decoder.decode(&mut response_buffer);
//! ```
//!
//! # Features
//!
//! - Streaming processing of HTTP messages
//! - Chunked transfer encoding in both directions
//! - Content-Length and close-delimited response bodies
//! - Zero-copy header parsing

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub(crate) use body::DEFAULT_MAX_CHUNK_SIZE;
pub use body::{PayloadDecoder, PayloadEncoder};
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
