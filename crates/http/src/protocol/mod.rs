//! Core HTTP protocol abstractions.
//!
//! This module provides the types shared by the codecs, the exchange driver
//! and callers: message and payload items, the request head, the response,
//! the exchange lifecycle, and the error types.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): Core message types and payload processing
//!   - [`Message`]: Represents either headers or payload chunks
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: Body framing (length, chunked, close-delimited, empty)
//!   - [`BodyChunk`]: One delivery of response body bytes
//!
//! - **Request** ([`request`]): [`RequestHead`] wraps `http::Request<()>`
//!
//! - **Response** ([`response`]): [`Response`] holds status line and headers
//!
//! - **Lifecycle** ([`state`]): [`ExchangeState`]
//!
//! - **Error Handling** ([`error`]):
//!   - [`ExchangeError`]: Top-level error kinds surfaced to callers
//!   - [`ExchangeFailure`]: An error plus the partial response
//!   - [`ParseError`]: Response decoding errors
//!   - [`SendError`]: Request encoding/writing errors

mod message;
pub use message::BodyChunk;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;

mod response;
pub use response::Response;

mod state;
pub use state::ExchangeState;

mod error;
pub use error::ExchangeError;
pub use error::ExchangeFailure;
pub use error::ParseError;
pub use error::SendError;
