//! HTTP head processing module
//!
//! # Components
//!
//! - [`HeaderEncoder`]: Encodes a request line and headers to bytes
//!   - Injects `Host` from the request URI
//!   - Manages content-length and transfer-encoding headers
//!
//! - [`HeaderDecoder`]: Decodes a response status line and headers from raw bytes
//!   - Manages header count and size limits
//!   - Selects the body framing of the response

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
