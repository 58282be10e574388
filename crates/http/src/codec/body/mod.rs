//! HTTP body handling module for request and response payloads
//!
//! Request bodies are encoded, response bodies decoded, each through a
//! framing-specific codec selected from the message head.
//!
//! # Components
//!
//! ## Decoders (response bodies)
//! - [`PayloadDecoder`]: Main decoder that coordinates the framing strategies
//! - `ChunkedDecoder`: Chunked transfer encoding, whole chunks only
//! - `LengthDecoder`: Content-Length payloads
//! - `CloseDecoder`: Payloads delimited by connection close
//!
//! ## Encoders (request bodies)
//! - [`PayloadEncoder`]: Main encoder that manages the framing strategies
//! - `ChunkedEncoder`: Chunked transfer encoding
//! - `LengthEncoder`: Content-Length payloads

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub(crate) use chunked_decoder::DEFAULT_MAX_CHUNK_SIZE;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
