use std::fmt;

use bytes::Bytes;
use http::Request;
use tokio::io::AsyncWriteExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::ClientConfig;
use crate::connection::{RequestWriter, ResponseReader};
use crate::protocol::{BodyChunk, ExchangeError, ExchangeFailure, ExchangeState, RequestHead, Response, SendError};
use crate::transport::Connect;

/// One HTTP/1.1 request/response exchange over a single connection.
///
/// [`execute`](Self::execute) connects, sends the request and reads the
/// response head; the body is then pulled with [`read_body`](Self::read_body).
/// Every awaited step races the exchange's cancellation token.
///
/// Any failure is terminal: the state moves to [`ExchangeState::Failed`] and
/// the connection is dropped before the error is returned.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use micro_http_client::client::ClientConfig;
/// use micro_http_client::connection::HttpExchange;
/// use micro_http_client::transport::TransportConnector;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let mut exchange = HttpExchange::new(TransportConnector::new(&config)?, &config);
///
/// let request = http::Request::get("http://localhost:8080/").body(Bytes::new())?;
/// let response = exchange.execute(request).await?;
/// println!("{} {}", response.status_code(), response.status_message());
///
/// loop {
///     let chunk = exchange.read_body(8 * 1024).await?;
///     print!("{}", String::from_utf8_lossy(&chunk.data));
///     if chunk.is_final {
///         break;
///     }
/// }
/// exchange.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpExchange<C: Connect> {
    connector: C,
    stream: Option<C::Stream>,
    reader: Option<ResponseReader>,
    response: Response,
    state: ExchangeState,
    keep_alive: bool,
    cancel: CancellationToken,
    read_buffer_size: usize,
    write_buffer_size: usize,
    chunk_size: usize,
    max_chunk_size: usize,
}

impl<C: Connect> fmt::Debug for HttpExchange<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExchange")
            .field("state", &self.state)
            .field("connected", &self.stream.is_some())
            .field("keep_alive", &self.keep_alive)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

impl<C: Connect> HttpExchange<C> {
    pub fn new(connector: C, config: &ClientConfig) -> Self {
        Self {
            connector,
            stream: None,
            reader: None,
            response: Response::default(),
            state: ExchangeState::Idle,
            keep_alive: false,
            cancel: CancellationToken::new(),
            read_buffer_size: config.read_buffer_size,
            write_buffer_size: config.write_buffer_size,
            chunk_size: config.chunk_size,
            max_chunk_size: config.max_chunk_size,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// The response as parsed so far; empty until the head was read.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Whether the connection could carry another exchange.
    ///
    /// False until a response head was read, when the server asked to close,
    /// for close-delimited bodies, after discarding bytes past the body, and
    /// after any failure.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Declared body bytes not yet read from the connection, see
    /// [`ResponseReader::body_length_left`].
    pub fn body_length_left(&self) -> Option<u64> {
        self.reader.as_ref().and_then(ResponseReader::body_length_left)
    }

    /// A handle that cancels whatever this exchange is awaiting, or will await next.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connects, sends `request` and reads the response head.
    ///
    /// `Host` is always set to the URI host. `Content-Length` is set from the
    /// body unless the request declares `Transfer-Encoding: chunked`, in which
    /// case the body is sent in chunks.
    ///
    /// # Errors
    ///
    /// The returned [`ExchangeFailure`] carries the response parsed so far,
    /// which is empty for failures before the status line.
    pub async fn execute(&mut self, request: Request<Bytes>) -> Result<Response, ExchangeFailure> {
        if self.state != ExchangeState::Idle {
            return Err(ExchangeFailure::new(ExchangeError::invalid_state("execute", self.state), self.response.clone()));
        }

        match self.do_execute(request).await {
            Ok(()) => Ok(self.response.clone()),
            Err(e) => {
                let error = self.fail(e);
                Err(ExchangeFailure::new(error, self.response.clone()))
            }
        }
    }

    async fn do_execute(&mut self, request: Request<Bytes>) -> Result<(), ExchangeError> {
        let (parts, body) = request.into_parts();
        let head = RequestHead::from(parts);
        let Some(host) = head.host().map(str::to_string) else {
            return Err(ExchangeError::invalid_request(format!("uri {} has no host", head.uri())));
        };
        let port = head.port();
        let method = head.method().clone();

        advance(&mut self.state, ExchangeState::Connecting);
        debug!(host, port, "connecting");
        let connect = async { self.connector.connect(&host, port).await.map_err(|e| ExchangeError::connect_failed(&host, port, e)) };
        let mut stream = cancellable(&self.cancel, connect).await?;

        advance(&mut self.state, ExchangeState::SendingHeaders);
        let payload_size = head.payload_size(body.len());
        let mut writer = RequestWriter::with_capacity(self.write_buffer_size, self.chunk_size);
        writer.write_head(head, payload_size)?;
        cancellable(&self.cancel, writer.flush(&mut stream)).await?;

        advance(&mut self.state, ExchangeState::SendingBody);
        writer.write_body(body)?;
        cancellable(&self.cancel, writer.flush(&mut stream)).await?;

        advance(&mut self.state, ExchangeState::ReadingHeaders);
        let mut reader = ResponseReader::with_capacity(&method, self.read_buffer_size).max_chunk_size(self.max_chunk_size);
        let head = cancellable(&self.cancel, reader.read_head(&mut stream)).await;
        let (response, payload_size) = match head {
            Ok(head) => head,
            Err(e) => {
                if let Some(partial) = reader.take_partial_response() {
                    self.response = partial;
                }
                return Err(e);
            }
        };

        self.keep_alive = response.keep_alive() && !payload_size.is_close();
        debug!(status = response.status_code(), ?payload_size, keep_alive = self.keep_alive, "received response head");
        self.response = response;
        self.stream = Some(stream);
        self.reader = Some(reader);
        advance(&mut self.state, ExchangeState::ReadingBody);
        Ok(())
    }

    /// Reads the next part of the response body, at most `max_size` bytes from
    /// the connection.
    ///
    /// Bytes already buffered are handed out without any I/O, even past
    /// `max_size`. Once a chunk with `is_final` was returned, further calls
    /// return empty final chunks.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::Cancelled`] once the exchange was cancelled or
    /// aborted, [`ExchangeError::InvalidState`] before the response head was
    /// read or after any other failure; any I/O or framing error fails the
    /// exchange.
    pub async fn read_body(&mut self, max_size: usize) -> Result<BodyChunk, ExchangeError> {
        match self.state {
            ExchangeState::Complete => return Ok(BodyChunk::eof()),
            ExchangeState::ReadingBody => {}
            ExchangeState::Failed if self.cancel.is_cancelled() => return Err(ExchangeError::Cancelled),
            current => return Err(ExchangeError::invalid_state("read body", current)),
        }

        let (Some(stream), Some(reader)) = (self.stream.as_mut(), self.reader.as_mut()) else {
            return Err(ExchangeError::invalid_state("read body", self.state));
        };

        match cancellable(&self.cancel, reader.read_body(stream, max_size)).await {
            Ok(chunk) => {
                if reader.discarded_spillover() {
                    self.keep_alive = false;
                }

                if chunk.is_final {
                    advance(&mut self.state, ExchangeState::Complete);
                    debug!(keep_alive = self.keep_alive, "response body finished");
                } else {
                    advance(&mut self.state, ExchangeState::ReadingBody);
                }
                Ok(chunk)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Tears the exchange down if it is between operations.
    ///
    /// An exchange that has not started is left alone; its next operation
    /// observes the cancelled token instead.
    pub fn abort(&mut self) {
        self.cancel.cancel();
        if self.state != ExchangeState::Idle && !self.state.is_terminal() {
            self.fail(ExchangeError::Cancelled);
        }
    }

    /// Shuts the connection down.
    ///
    /// Closing before the body was fully read abandons the response and fails
    /// the exchange.
    pub async fn close(&mut self) -> Result<(), ExchangeError> {
        if !self.state.is_terminal() && self.state != ExchangeState::Idle {
            warn!(state = ?self.state, "close exchange before the response was complete");
            self.keep_alive = false;
            advance(&mut self.state, ExchangeState::Failed);
        }

        self.reader.take();
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        debug!("shutdown connection");
        stream.shutdown().await.map_err(SendError::io)?;
        Ok(())
    }

    /// Moves to `Failed` and drops the connection before the error is surfaced.
    fn fail(&mut self, error: ExchangeError) -> ExchangeError {
        if error.is_cancelled() {
            debug!(state = ?self.state, "exchange cancelled");
        } else {
            error!(cause = %error, state = ?self.state, "exchange failed");
        }

        self.stream.take();
        self.reader.take();
        self.keep_alive = false;
        advance(&mut self.state, ExchangeState::Failed);
        error
    }
}

fn advance(state: &mut ExchangeState, next: ExchangeState) {
    debug_assert!(state.can_advance_to(next), "illegal transition {state:?} -> {next:?}");
    *state = next;
}

/// Runs `future` unless `token` is cancelled first.
async fn cancellable<F, T, E>(token: &CancellationToken, future: F) -> Result<T, ExchangeError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ExchangeError>,
{
    select! {
        biased;
        _ = token.cancelled() => Err(ExchangeError::Cancelled),
        result = future => result.map_err(Into::into),
    }
}
