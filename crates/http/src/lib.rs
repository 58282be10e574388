//! An asynchronous micro HTTP/1.1 client exchange
//!
//! This crate sends one request over one connection and reads the response,
//! handing the body out incrementally. It is built on top of tokio and keeps
//! the wire handling in small codecs in the style of `tokio_util::codec`.
//!
//! # Features
//!
//! - HTTP/1.1 requests over plain TCP or TLS (rustls)
//! - Request bodies with `Content-Length` or chunked transfer encoding
//! - Response bodies framed by `Content-Length`, chunked transfer encoding or
//!   connection close
//! - Incremental body reads bounded by a caller supplied size
//! - Keep-alive tracking
//! - Cancellation of every I/O step
//! - Zero-copy header parsing
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use micro_http_client::client::{ClientConfig, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(ClientConfig::default())?;
//!     let mut exchange = client.exchange();
//!
//!     let request = http::Request::get("http://127.0.0.1:8080/").body(Bytes::new())?;
//!     let response = exchange.execute(request).await?;
//!     println!("{} {}", response.status_code(), response.status_message());
//!
//!     loop {
//!         let chunk = exchange.read_body(8 * 1024).await?;
//!         print!("{}", String::from_utf8_lossy(&chunk.data));
//!         if chunk.is_final {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`client`]: Configuration and the callback surface ([`client::HttpClient`])
//! - [`connection`]: The exchange driver ([`connection::HttpExchange`])
//! - [`transport`]: Plain and TLS streams and the [`transport::Connect`] seam
//! - [`protocol`]: Protocol types and errors
//! - [`codec`]: Request encoding and response decoding
//!
//! # Core Components
//!
//! ## Exchange
//!
//! [`connection::HttpExchange`] moves through connect, send headers, send
//! body, read headers and read body, recording its progress in
//! [`protocol::ExchangeState`]. A failure at any stage drops the connection
//! and is reported together with whatever part of the response was parsed.
//!
//! ## Body Reading
//!
//! The response body is never buffered whole. Each read hands out what is
//! already buffered, reading from the connection only when needed, and never
//! reads past the end of a `Content-Length` body. Chunked bodies are handed
//! out in whole chunks with their framing removed.
//!
//! ## Error Handling
//!
//! - [`protocol::ExchangeError`]: Top-level error kinds
//! - [`protocol::ExchangeFailure`]: An error plus the partial response
//! - [`protocol::ParseError`]: Response decoding errors
//! - [`protocol::SendError`]: Request encoding and sending errors
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - One exchange per connection, no pooling or pipelining
//! - No redirects, cookies, proxies or retries
//! - Maximum response header size: 8KB
//! - Maximum number of response headers: 64

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
