//! HTTP exchange handling module
//!
//! This module drives a single request/response exchange over one connection.
//!
//! # Components
//!
//! - [`HttpExchange`]: Main exchange driver that:
//!   - Connects through a [`Connect`](crate::transport::Connect) implementation
//!   - Sends the request head and body
//!   - Reads the response head and hands out the body on demand
//!   - Tracks keep-alive eligibility and the exchange state
//!   - Races every step against a cancellation token
//!
//! - [`RequestWriter`]: Buffers the encoded request and flushes it to the stream
//!
//! - [`ResponseReader`]: Owns the receive buffer, parses the response head and
//!   performs the incremental body reads

mod exchange;
mod request_writer;
mod response_reader;

pub use exchange::HttpExchange;
pub use request_writer::RequestWriter;
pub use response_reader::ResponseReader;
