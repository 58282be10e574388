//! Callback surface over [`HttpExchange`].
//!
//! [`HttpClient::start`] spawns an exchange on the tokio runtime and reports
//! the response head, or the failure, to a completion callback that fires
//! exactly once. The returned [`ExchangeHandle`] pulls the body with
//! [`read_body`](ExchangeHandle::read_body) and can [`cancel`](ExchangeHandle::cancel)
//! the exchange at any point.
//!
//! Every spawned operation holds its own `Arc` of the exchange, so the handle
//! may be dropped while an operation is pending.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use micro_http_client::client::{ClientConfig, HttpClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(ClientConfig::default())?;
//! let request = http::Request::get("http://localhost:8080/").body(Bytes::new())?;
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! let handle = client.start(request, move |result| {
//!     let _ = tx.send(result);
//! });
//!
//! let response = rx.await??;
//! println!("status {}", response.status_code());
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! handle.read_body(8 * 1024, move |chunk| {
//!     let _ = tx.send(chunk);
//! });
//! let chunk = rx.await??;
//! println!("{} bytes, final: {}", chunk.len(), chunk.is_final);
//! # Ok(())
//! # }
//! ```

mod completion;
mod config;

pub use completion::{CompletionSlot, OnComplete};
pub use config::ClientConfig;

use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::HttpExchange;
use crate::protocol::{BodyChunk, ExchangeError, ExchangeFailure, ExchangeState, Response};
use crate::transport::{Connect, TransportConnector};

/// Starts exchanges with a shared configuration.
#[derive(Debug, Clone)]
pub struct HttpClient<C = TransportConnector> {
    connector: C,
    config: ClientConfig,
}

impl HttpClient<TransportConnector> {
    /// Creates a client opening plain TCP connections, or TLS ones when the
    /// config carries a CA certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Tls`] if the configured certificates can't be used.
    pub fn new(config: ClientConfig) -> Result<Self, ExchangeError> {
        let connector = TransportConnector::new(&config)?;
        Ok(Self { connector, config })
    }
}

impl<C> HttpClient<C>
where
    C: Connect + Clone + Sync + 'static,
{
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A fresh exchange for the async surface.
    pub fn exchange(&self) -> HttpExchange<C> {
        HttpExchange::new(self.connector.clone(), &self.config)
    }

    /// Spawns an exchange sending `request`.
    ///
    /// `on_complete` receives the response head once it is parsed, or the
    /// failure of any stage before that, together with the response parsed
    /// so far. It is called exactly once.
    pub fn start<F>(&self, request: Request<Bytes>, on_complete: F) -> ExchangeHandle<C>
    where
        F: FnOnce(Result<Response, ExchangeFailure>) + Send + 'static,
    {
        let exchange = self.exchange();
        let cancel = exchange.cancel_token();
        let shared = Arc::new(Shared { exchange: Mutex::new(exchange), completion: CompletionSlot::new(on_complete) });

        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let result = task_shared.exchange.lock().await.execute(request).await;
            task_shared.completion.fire(result);
        });

        ExchangeHandle { shared, cancel }
    }
}

struct Shared<C: Connect> {
    exchange: Mutex<HttpExchange<C>>,
    completion: CompletionSlot,
}

/// Controls an exchange spawned by [`HttpClient::start`].
pub struct ExchangeHandle<C: Connect = TransportConnector> {
    shared: Arc<Shared<C>>,
    cancel: CancellationToken,
}

impl<C: Connect> std::fmt::Debug for ExchangeHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("completion", &self.shared.completion)
            .finish_non_exhaustive()
    }
}

impl<C> ExchangeHandle<C>
where
    C: Connect + Sync + 'static,
{
    /// Reads the next part of the body and passes it to `on_chunk`.
    ///
    /// Valid once the completion callback received a response. Issue the next
    /// read from within, or after, the previous `on_chunk`; reads issued
    /// together run in no particular order.
    pub fn read_body<F>(&self, max_size: usize, on_chunk: F)
    where
        F: FnOnce(Result<BodyChunk, ExchangeError>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = shared.exchange.lock().await.read_body(max_size).await;
            on_chunk(result);
        });
    }

    /// Cancels the exchange.
    ///
    /// A pending operation fails with [`ExchangeError::Cancelled`]; the
    /// completion callback reports it if the response head was not read yet.
    /// An exchange idle between body reads drops its connection right away.
    /// Body reads issued before or after the cancel, including ones still
    /// waiting for their turn, report [`ExchangeError::Cancelled`] too.
    pub fn cancel(&self) {
        debug!("cancel exchange");
        self.cancel.cancel();

        // nothing in flight holds the lock
        if let Ok(mut exchange) = self.shared.exchange.try_lock() {
            exchange.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the completion callback already ran.
    pub fn is_completed(&self) -> bool {
        self.shared.completion.is_fired()
    }

    /// Waits for any pending operation, then reports the exchange state.
    pub async fn state(&self) -> ExchangeState {
        self.shared.exchange.lock().await.state()
    }

    /// Waits for any pending operation, then reports keep-alive eligibility.
    pub async fn keep_alive(&self) -> bool {
        self.shared.exchange.lock().await.keep_alive()
    }

    /// Waits for any pending operation, then reports the declared body bytes
    /// still to be read.
    pub async fn body_length_left(&self) -> Option<u64> {
        self.shared.exchange.lock().await.body_length_left()
    }

    /// Waits for any pending operation, then shuts the connection down.
    ///
    /// # Errors
    ///
    /// Returns the shutdown error of the underlying stream.
    pub async fn close(&self) -> Result<(), ExchangeError> {
        self.shared.exchange.lock().await.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::oneshot;

    /// Hands out one in-memory stream, then refuses.
    #[derive(Clone)]
    struct DuplexConnector {
        stream: Arc<std::sync::Mutex<Option<DuplexStream>>>,
    }

    impl Connect for DuplexConnector {
        type Stream = DuplexStream;

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream> {
            let stream = self.stream.lock().map_err(|_| io::Error::other("poisoned"))?.take();
            stream.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    fn client_pair() -> (HttpClient<DuplexConnector>, DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        let connector = DuplexConnector { stream: Arc::new(std::sync::Mutex::new(Some(client))) };
        (HttpClient::with_connector(connector, ClientConfig::default()), server)
    }

    async fn read_request_head(server: &mut DuplexStream) -> String {
        let mut received = Vec::new();
        while !received.ends_with(b"\r\n\r\n") {
            let mut buf = [0u8; 1024];
            let n = server.read(&mut buf).await.unwrap();
            assert_ne!(n, 0);
            received.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(received).unwrap()
    }

    fn start(
        client: &HttpClient<DuplexConnector>,
        uri: &str,
    ) -> (ExchangeHandle<DuplexConnector>, oneshot::Receiver<Result<Response, ExchangeFailure>>) {
        let (tx, rx) = oneshot::channel();
        let request = Request::get(uri).body(Bytes::new()).unwrap();
        let handle = client.start(request, move |result| {
            let _ = tx.send(result);
        });
        (handle, rx)
    }

    async fn read_body(handle: &ExchangeHandle<DuplexConnector>, max_size: usize) -> Result<BodyChunk, ExchangeError> {
        let (tx, rx) = oneshot::channel();
        handle.read_body(max_size, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn start_then_read_body() {
        let (client, mut server) = client_pair();

        let (handle, rx) = start(&client, "http://example.com/greeting");
        let request = read_request_head(&mut server).await;
        assert!(request.starts_with("GET /greeting HTTP/1.1\r\n"));
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();

        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.status_message(), "OK");
        assert!(handle.is_completed());
        assert_eq!(handle.body_length_left().await, Some(0));

        let chunk = read_body(&handle, 1024).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"hello");
        assert!(chunk.is_final);
        assert_eq!(handle.state().await, ExchangeState::Complete);
        assert!(handle.keep_alive().await);

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused_fires_once() {
        let connector = DuplexConnector { stream: Arc::new(std::sync::Mutex::new(None)) };
        let client = HttpClient::with_connector(connector, ClientConfig::default());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (tx, rx) = oneshot::channel();
        let request = Request::get("http://example.com/").body(Bytes::new()).unwrap();
        let handle = client.start(request, move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });

        let failure = rx.await.unwrap().unwrap_err();
        assert!(matches!(failure.error, ExchangeError::ConnectFailed { .. }));
        assert!(failure.response.is_empty());
        assert_eq!(handle.state().await, ExchangeState::Failed);

        handle.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_before_head_reports_cancelled() {
        let (client, mut server) = client_pair();

        let (handle, rx) = start(&client, "http://example.com/slow");
        read_request_head(&mut server).await;
        handle.cancel();

        let failure = rx.await.unwrap().unwrap_err();
        assert!(failure.error.is_cancelled());
        assert!(failure.response.is_empty());
        assert!(handle.is_cancelled());
        assert_eq!(handle.state().await, ExchangeState::Failed);
    }

    #[tokio::test]
    async fn cancel_between_body_reads_drops_connection() {
        let (client, mut server) = client_pair();

        let (handle, rx) = start(&client, "http://example.com/large");
        read_request_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npart").await.unwrap();
        rx.await.unwrap().unwrap();

        let chunk = read_body(&handle, 4).await.unwrap();
        assert_eq!(chunk.data.as_ref(), b"part");

        handle.cancel();
        assert_eq!(handle.state().await, ExchangeState::Failed);

        let mut buf = Vec::new();
        assert_eq!(server.read_to_end(&mut buf).await.unwrap(), 0);

        let error = read_body(&handle, 4).await.unwrap_err();
        assert!(error.is_cancelled());
    }

    #[tokio::test]
    async fn read_queued_before_cancel_reports_cancelled() {
        let (client, mut server) = client_pair();

        let (handle, rx) = start(&client, "http://example.com/large");
        read_request_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n").await.unwrap();
        rx.await.unwrap().unwrap();

        // the read task has not run yet, so cancel finds the lock free and aborts first
        let (tx, chunk_rx) = oneshot::channel();
        handle.read_body(4, move |result| {
            let _ = tx.send(result);
        });
        handle.cancel();

        let error = chunk_rx.await.unwrap().unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(handle.state().await, ExchangeState::Failed);
    }

    #[tokio::test]
    async fn handle_may_be_dropped_while_pending() {
        let (client, mut server) = client_pair();

        let (handle, rx) = start(&client, "http://example.com/");
        drop(handle);

        read_request_head(&mut server).await;
        server.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").await.unwrap();

        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.status_code(), 204);
    }
}
