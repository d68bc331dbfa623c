//! Per-connection protocol state machine.
//!
//! # States
//! ```text
//! Open ──read_request──▶ HeadersPending ──send_headers──▶ HeadersSent
//!   ▲                                                         │
//!   └──────────── finish_response (keep-alive) ◀──────────────┘
//! any ──close──▶ Closed (absorbing)
//! ```
//!
//! # Responsibilities
//! - Accumulate socket reads until the header block is framed
//! - Parse the request and spool its body
//! - Serialize the response head exactly once and layer the body pipeline
//! - Switch to a framed WebSocket stream on upgrade
//! - Tear the connection down on close, swallowing I/O failures

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

use super::body::{body_prefix_len, has_body, ingest};
use super::cookie::Cookie;
use super::error::HttpError;
use super::frame::{Frame, FrameDetector};
use super::pipeline::{ContentEncoding, Pipeline};
use super::request::{parse_request_head, HttpRequest, HttpVersion};
use super::response::{reason_phrase, HttpResponse};
use super::session::SESSION_COOKIE;
use super::settings::EngineSettings;
use super::websocket::{accept_key, handshake_response, requested_protocol, WebSocket};
use crate::net::connection::ConnectionId;
use crate::net::stream::{Socket, Stream};
use crate::observability::metrics;
use crate::resilience::timeouts::io_timeout;

/// Lifecycle position of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Waiting for (the rest of) a request head.
    Open,
    /// Request parsed, response head not written yet.
    HeadersPending,
    /// Response head written; body bytes go through the pipeline.
    HeadersSent,
    Closed,
}

/// One accepted connection and the exchange currently running on it.
pub struct Context<S: Socket = Stream> {
    id: ConnectionId,
    socket: S,
    settings: Arc<EngineSettings>,
    read_buf: Vec<u8>,
    buffer: Vec<u8>,
    frame: FrameDetector,
    body_start: usize,
    consumed: usize,
    pub request: HttpRequest,
    pub response: HttpResponse,
    session_id: String,
    pipeline: Pipeline,
    state: ContextState,
    body_allowed: bool,
    framed: bool,
    secure: bool,
    websocket: bool,
    peer_addr: Option<SocketAddr>,
    exchanges: u32,
    started: Instant,
}

impl<S: Socket> std::fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("status", &self.response.status)
            .field("secure", &self.secure)
            .field("exchanges", &self.exchanges)
            .finish()
    }
}

impl<S: Socket> Context<S> {
    pub fn new(id: ConnectionId, socket: S, settings: Arc<EngineSettings>, secure: bool) -> Self {
        let response = HttpResponse::new(&settings.server_name);
        Self {
            id,
            socket,
            read_buf: vec![0; settings.read_chunk_bytes.max(1)],
            buffer: Vec::new(),
            frame: FrameDetector::new(settings.max_header_bytes),
            body_start: 0,
            consumed: 0,
            request: HttpRequest::default(),
            response,
            session_id: String::new(),
            pipeline: Pipeline::identity(),
            state: ContextState::Open,
            body_allowed: true,
            framed: false,
            secure,
            websocket: false,
            peer_addr: None,
            exchanges: 0,
            started: Instant::now(),
            settings,
        }
    }

    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != ContextState::Closed
    }

    pub fn headers_sent(&self) -> bool {
        self.state == ContextState::HeadersSent
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_websocket(&self) -> bool {
        self.websocket
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Completed exchanges on this connection, the current one included.
    pub fn exchanges(&self) -> u32 {
        self.exchanges
    }

    fn begin_exchange(&mut self) {
        // keep pipelined bytes that follow the previous exchange
        let consumed = self.consumed.min(self.buffer.len());
        self.buffer.drain(..consumed);
        self.consumed = 0;
        self.frame.reset();
        self.body_start = 0;
        self.request = HttpRequest::default();
        self.response = HttpResponse::new(&self.settings.server_name);
        self.session_id.clear();
        self.pipeline = Pipeline::identity();
        self.body_allowed = true;
        self.framed = false;
        self.state = ContextState::Open;
    }

    /// Read the next request on this connection.
    ///
    /// Returns `Ok(false)` when the peer closed the connection cleanly before
    /// sending anything. Bodies of non-GET requests are spooled and decoded
    /// before this returns.
    pub async fn read_request(&mut self) -> Result<bool, HttpError> {
        if self.state == ContextState::Closed {
            return Err(HttpError::Closed);
        }
        self.begin_exchange();

        let head_end = loop {
            if !self.buffer.is_empty() {
                if let Frame::Complete { head_end, body_start } = self.frame.scan(&self.buffer)? {
                    self.body_start = body_start;
                    break head_end;
                }
            }
            let limit = if self.buffer.is_empty() && self.exchanges > 0 {
                self.settings.idle_timeout
            } else {
                self.settings.receive_timeout
            };
            let n = io_timeout(limit, self.socket.read(&mut self.read_buf)).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(false);
                }
                return Err(HttpError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            self.buffer.extend_from_slice(&self.read_buf[..n]);
        };

        self.started = Instant::now();
        let mut request = parse_request_head(&self.buffer[..head_end])?;
        self.exchanges += 1;

        self.session_id = request
            .cookie(SESSION_COOKIE)
            .map(|c| c.value.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.settings.session_ids.next_id());

        self.response.version = request.version.clamp(HttpVersion::HTTP_10, HttpVersion::HTTP_11);
        self.response.keep_alive = !request.wants_close();
        self.state = ContextState::HeadersPending;

        tracing::debug!(
            connection_id = %self.id,
            method = %request.method,
            path = %request.path,
            version = %request.version,
            "Request parsed"
        );

        let leftover = self.buffer.len() - self.body_start;
        self.consumed = self.body_start;
        if has_body(&request, leftover) {
            self.consumed += body_prefix_len(request.content_length, leftover);
            let body = ingest(
                &mut self.socket,
                &self.buffer[self.body_start..],
                request.content_length,
                self.settings.read_chunk_bytes,
                self.settings.receive_timeout,
            )
            .await?;
            if body.is_partial() {
                tracing::debug!(
                    connection_id = %self.id,
                    received = body.received,
                    expected = body.expected,
                    "Dispatching with partial body"
                );
            }
            self.settings.decoders.attach(&mut request, body).await?;
        }

        self.request = request;
        Ok(true)
    }

    fn prepare_headers(&mut self) {
        let settings = Arc::clone(&self.settings);
        let method = self.request.method.as_str();
        let status = self.response.status;
        self.body_allowed = !(method.eq_ignore_ascii_case("HEAD")
            || (100..200).contains(&status)
            || status == 204
            || status == 304);
        let fixed_length = self.response.headers.contains("Content-Length");

        let response = &mut self.response;
        let content_type = response
            .headers
            .get("Content-Type")
            .map(str::to_string)
            .unwrap_or_else(|| response.content_type.clone());
        let content_type = if content_type.to_ascii_lowercase().contains("charset") {
            content_type
        } else {
            format!("{}; charset={}", content_type, settings.default_charset)
        };
        response.headers.set("Content-Type", content_type);

        let encoding = if settings.compression && self.body_allowed && !fixed_length {
            ContentEncoding::negotiate(self.request.headers.get("Accept-Encoding"))
        } else {
            ContentEncoding::Identity
        };
        response.content_encoding = encoding;
        if let Some(coding) = encoding.as_str() {
            response.headers.set("Content-Encoding", coding);
        }

        if !response.keep_alive || response.is_error() || self.exchanges >= settings.keep_alive_max {
            response.keep_alive = false;
            response.headers.set("Connection", "close");
        } else {
            response.headers.set(
                "Keep-Alive",
                format!(
                    "timeout={},max={}",
                    settings.keep_alive_timeout_secs, settings.keep_alive_max
                ),
            );
            if response.version <= HttpVersion::HTTP_10 {
                response.headers.set("Connection", "keep-alive");
            }
        }

        if !self.session_id.is_empty() {
            let mut cookie = Cookie::new(SESSION_COOKIE, self.session_id.clone())
                .with_path("/")
                .http_only();
            if self.secure {
                cookie = cookie.secure();
            }
            response.set_cookie(cookie);
        }

        let chunked = response.is_chunked() && self.body_allowed && !fixed_length;
        if chunked {
            response.headers.set("Transfer-Encoding", "chunked");
        }
        self.framed = chunked || fixed_length || !self.body_allowed;
        self.pipeline = Pipeline::build(encoding, chunked);
    }

    /// Serialize and write the response head. A no-op once sent.
    ///
    /// The head goes straight to the socket; only body bytes use the
    /// pipeline. Headers count as sent even when the write fails.
    pub async fn send_headers(&mut self) -> Result<(), HttpError> {
        match self.state {
            ContextState::Closed => return Err(HttpError::Closed),
            ContextState::HeadersSent => return Ok(()),
            _ => {}
        }
        self.prepare_headers();
        let head = self.response.serialize_head();
        self.state = ContextState::HeadersSent;

        let written = match self.write_raw(head.as_bytes()).await {
            Ok(()) => self.flush_raw().await,
            Err(e) => Err(e),
        };
        if let Err(e) = &written {
            tracing::debug!(connection_id = %self.id, error = %e, "Failed to write response head");
        }
        written
    }

    /// Write body bytes, sending the head first if needed.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), HttpError> {
        if self.state == ContextState::Closed {
            return Err(HttpError::Closed);
        }
        self.send_headers().await?;
        if !self.body_allowed {
            return Ok(());
        }
        let wire = self.pipeline.encode(data)?;
        if !wire.is_empty() {
            self.write_raw(&wire).await?;
        }
        Ok(())
    }

    pub async fn write_str(&mut self, text: &str) -> Result<(), HttpError> {
        self.write(text.as_bytes()).await
    }

    /// Set status and content type, then write `body`.
    pub async fn respond(&mut self, status: u16, content_type: &str, body: &[u8]) -> Result<(), HttpError> {
        if !self.headers_sent() {
            self.response.status = status;
            self.response.content_type = content_type.to_string();
        }
        self.write(body).await
    }

    /// Answer with a bare status: `text/plain` body `"<code> <reason>"`.
    pub async fn send_status(&mut self, status: u16) -> Result<(), HttpError> {
        let body = format!("{} {}", status, reason_phrase(status));
        self.respond(status, "text/plain", body.as_bytes()).await
    }

    /// Flush buffered wire bytes to the socket.
    pub async fn flush(&mut self) -> Result<(), HttpError> {
        self.flush_raw().await
    }

    /// End the current exchange: head if still pending, pipeline
    /// terminator, flush. Idempotent per exchange.
    pub async fn finish_response(&mut self) -> Result<(), HttpError> {
        match self.state {
            ContextState::Closed | ContextState::Open => return Ok(()),
            ContextState::HeadersPending => self.send_headers().await?,
            ContextState::HeadersSent => {}
        }
        if self.pipeline.is_finished() {
            return Ok(());
        }
        let tail = self.pipeline.finish()?;
        metrics::record_request(&self.request.method, self.response.status, self.started);
        if let Some(profiler) = &self.settings.profiler {
            profiler.record(
                self.request.host.as_deref().unwrap_or_default(),
                &self.request.path,
                self.started.elapsed(),
            );
        }
        if !tail.is_empty() {
            self.write_raw(&tail).await?;
        }
        self.flush_raw().await?;

        tracing::debug!(
            connection_id = %self.id,
            status = self.response.status,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Response finished"
        );
        Ok(())
    }

    /// Whether another request may follow on this connection.
    pub fn can_reuse(&self) -> bool {
        self.is_open()
            && self.response.keep_alive
            && self.framed
            && self.pipeline.is_finished()
            && !self.websocket
    }

    /// Answer a request that could not be parsed, then close.
    pub async fn reject(&mut self, status: u16) {
        if self.state == ContextState::Open {
            self.state = ContextState::HeadersPending;
        }
        if !self.headers_sent() {
            self.response.keep_alive = false;
            self.response.version = HttpVersion::HTTP_11;
            let _ = self.send_status(status).await;
        }
        self.close().await;
    }

    /// Finish any pending response and tear the connection down.
    ///
    /// Every I/O failure on this path is swallowed. Calling it again is a
    /// no-op.
    pub async fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        if let Err(e) = self.finish_response().await {
            tracing::debug!(connection_id = %self.id, error = %e, "Error while finishing response on close");
        }
        let _ = self.flush_raw().await;
        let _ = io_timeout(self.settings.send_timeout, self.socket.shutdown()).await;
        self.state = ContextState::Closed;
    }

    /// Drop the connection without writing anything.
    pub async fn abandon(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        let _ = io_timeout(self.settings.send_timeout, self.socket.shutdown()).await;
        self.state = ContextState::Closed;
    }

    /// Complete the WebSocket handshake and hand the socket to a framed stream.
    pub async fn accept_websocket(mut self) -> Result<WebSocket<S>, HttpError> {
        match self.state {
            ContextState::Closed => return Err(HttpError::Closed),
            ContextState::HeadersSent => return Err(HttpError::HeadersAlreadySent),
            _ => {}
        }
        let key = self
            .request
            .websocket_key()
            .ok_or_else(|| HttpError::bad_request("missing Sec-WebSocket-Key"))?;
        let accept = accept_key(key);
        let protocol = requested_protocol(&self.request);
        let head = handshake_response(&self.settings.server_name, &accept, protocol.as_deref());

        self.state = ContextState::HeadersSent;
        self.write_raw(head.as_bytes()).await?;
        self.flush_raw().await?;
        self.websocket = true;
        metrics::record_websocket_upgrade();
        tracing::debug!(connection_id = %self.id, path = %self.request.path, "Upgraded to WebSocket");

        let leftover = self.buffer.split_off(self.body_start.min(self.buffer.len()));
        let Context {
            socket,
            request,
            session_id,
            secure,
            ..
        } = self;
        let stream = WebSocketStream::from_partially_read(socket, leftover, Role::Server, None).await;
        Ok(WebSocket {
            request,
            session_id,
            protocol,
            secure,
            stream,
        })
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), HttpError> {
        io_timeout(self.settings.send_timeout, self.socket.write_all(bytes)).await
    }

    async fn flush_raw(&mut self) -> Result<(), HttpError> {
        io_timeout(self.settings.send_timeout, self.socket.flush()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::session::SessionIdSource;
    use std::io::Read;
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};

    struct FixedIds;

    impl SessionIdSource for FixedIds {
        fn next_id(&self) -> String {
            "fixed".to_string()
        }
    }

    fn settings() -> Arc<EngineSettings> {
        Arc::new(EngineSettings {
            receive_timeout: Duration::from_secs(2),
            send_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_millis(200),
            ..EngineSettings::default().with_session_ids(FixedIds)
        })
    }

    fn context() -> (Context<DuplexStream>, DuplexStream) {
        let (server, client) = duplex(64 * 1024);
        (Context::new(ConnectionId::new(), server, settings(), false), client)
    }

    async fn read_all(client: &mut DuplexStream) -> String {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn get_round_trip_uses_chunked_framing() {
        let (mut ctx, mut client) = context();
        client
            .write_all(b"GET /hello?a=1&b=2&b=3 HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();

        assert!(ctx.read_request().await.unwrap());
        assert_eq!(ctx.state(), ContextState::HeadersPending);
        assert_eq!(ctx.request.path, "/hello");
        assert_eq!(ctx.request.get.get("b").unwrap().values(), ["2", "3"]);
        assert_eq!(ctx.session_id(), "fixed");

        ctx.response.content_type = "text/plain".to_string();
        ctx.write_str("hi").await.unwrap();
        assert!(ctx.headers_sent());
        ctx.close().await;

        let wire = read_all(&mut client).await;
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"), "{}", wire);
        assert!(wire.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(wire.contains("Transfer-Encoding: chunked\r\n"));
        assert!(wire.contains("Keep-Alive: timeout=15,max=100\r\n"));
        assert!(!wire.contains("Connection: keep-alive"));
        assert!(wire.contains("Set-Cookie: SESSION-ID=fixed; Path=/; HttpOnly\r\n"));
        assert!(wire.ends_with("\r\n\r\n2\r\nhi\r\n0\r\n\r\n"), "{}", wire);
    }

    #[tokio::test]
    async fn session_cookie_is_adopted() {
        let (mut ctx, mut client) = context();
        client
            .write_all(b"GET / HTTP/1.1\r\nCookie: SESSION-ID=abc123\r\n\r\n")
            .await
            .unwrap();
        ctx.read_request().await.unwrap();
        assert_eq!(ctx.session_id(), "abc123");
    }

    #[tokio::test]
    async fn http10_gets_explicit_keep_alive_and_no_chunking() {
        let (mut ctx, mut client) = context();
        client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
        ctx.read_request().await.unwrap();
        ctx.write_str("plain").await.unwrap();
        assert!(!ctx.can_reuse());
        ctx.close().await;

        let wire = read_all(&mut client).await;
        assert!(wire.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(wire.contains("Connection: keep-alive\r\n"));
        assert!(!wire.contains("Transfer-Encoding"));
        assert!(wire.ends_with("\r\n\r\nplain"));
    }

    #[tokio::test]
    async fn error_status_closes_connection() {
        let (mut ctx, mut client) = context();
        client.write_all(b"GET /missing HTTP/1.1\r\n\r\n").await.unwrap();
        ctx.read_request().await.unwrap();
        ctx.respond(404, "text/plain", b"nope").await.unwrap();
        ctx.finish_response().await.unwrap();
        assert!(!ctx.can_reuse());
        ctx.close().await;

        let wire = read_all(&mut client).await;
        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(wire.contains("Connection: close\r\n"));
        assert!(!wire.contains("Keep-Alive"));
    }

    #[tokio::test]
    async fn gzip_is_negotiated() {
        let (mut ctx, mut client) = context();
        client
            .write_all(b"GET / HTTP/1.1\r\nAccept-Encoding: deflate, gzip\r\n\r\n")
            .await
            .unwrap();
        ctx.read_request().await.unwrap();
        ctx.write_str("compress me").await.unwrap();
        ctx.close().await;
        assert_eq!(ctx.response.content_encoding, ContentEncoding::Gzip);

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        let text = String::from_utf8_lossy(&wire);
        assert!(text.contains("Content-Encoding: gzip\r\n"));

        let body_start = text.find("\r\n\r\n").unwrap() + 4;
        let mut rest = &wire[body_start..];
        let mut compressed = Vec::new();
        loop {
            let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let size = usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap(), 16).unwrap();
            rest = &rest[line_end + 2..];
            if size == 0 {
                break;
            }
            compressed.extend_from_slice(&rest[..size]);
            rest = &rest[size + 2..];
        }
        let mut decoded = String::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "compress me");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut ctx, mut client) = context();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        ctx.read_request().await.unwrap();
        ctx.close().await;
        assert!(!ctx.is_open());
        ctx.close().await;
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(matches!(ctx.write(b"x").await, Err(HttpError::Closed)));

        // handler never wrote: close still produced a complete empty response
        let wire = read_all(&mut client).await;
        assert_eq!(wire.matches("HTTP/1.1 200 OK").count(), 1);
        assert!(wire.ends_with("\r\n\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn headers_are_written_once() {
        let (mut ctx, mut client) = context();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        ctx.read_request().await.unwrap();
        ctx.send_headers().await.unwrap();
        ctx.response.set_header("X-Late", "ignored");
        ctx.send_headers().await.unwrap();
        ctx.close().await;

        let wire = read_all(&mut client).await;
        assert_eq!(wire.matches("HTTP/1.1").count(), 1);
        assert!(!wire.contains("X-Late"));
    }

    #[tokio::test]
    async fn negative_content_length_is_rejected_before_body_read() {
        let (mut ctx, mut client) = context();
        client
            .write_all(b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n")
            .await
            .unwrap();
        let err = ctx.read_request().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(ctx.request.input.is_none());
        ctx.reject(400).await;

        let wire = read_all(&mut client).await;
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let (mut ctx, mut client) = context();
        let writer = tokio::spawn(async move {
            let mut head = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
            head.resize(40 * 1024, b'a');
            let _ = client.write_all(&head).await;
            client
        });
        let err = ctx.read_request().await.unwrap_err();
        assert!(matches!(err, HttpError::HeaderTooLarge { .. }));
        let _client = writer.await.unwrap();
    }

    #[tokio::test]
    async fn body_is_spooled_from_leftover_and_later_reads() {
        let (mut ctx, mut client) = context();
        let writer = tokio::spawn(async move {
            client
                .write_all(b"POST /form HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 11\r\n\r\nname=")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"alice!").await.unwrap();
            client
        });
        assert!(ctx.read_request().await.unwrap());
        assert_eq!(ctx.request.form("name"), Some("alice!"));
        let _client = writer.await.unwrap();
    }

    #[tokio::test]
    async fn keep_alive_serves_sequential_requests() {
        let (mut ctx, mut client) = context();
        client
            .write_all(b"GET /one HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        ctx.read_request().await.unwrap();
        ctx.write_str("1").await.unwrap();
        ctx.finish_response().await.unwrap();
        assert!(ctx.can_reuse());
        assert_eq!(ctx.state(), ContextState::HeadersSent);

        client.write_all(b"GET /two HTTP/1.1\r\n\r\n").await.unwrap();
        assert!(ctx.read_request().await.unwrap());
        assert_eq!(ctx.request.path, "/two");
        assert_eq!(ctx.exchanges(), 2);
        assert!(!ctx.headers_sent());
        ctx.close().await;
    }

    #[tokio::test]
    async fn clean_eof_between_requests() {
        let (mut ctx, client) = context();
        drop(client);
        assert!(!ctx.read_request().await.unwrap());
    }

    #[tokio::test]
    async fn head_responses_carry_no_body() {
        let (mut ctx, mut client) = context();
        client.write_all(b"HEAD / HTTP/1.1\r\n\r\n").await.unwrap();
        ctx.read_request().await.unwrap();
        ctx.write_str("ignored").await.unwrap();
        ctx.close().await;

        let wire = read_all(&mut client).await;
        assert!(wire.ends_with("\r\n\r\n"));
        assert!(!wire.contains("ignored"));
        assert!(!wire.contains("Transfer-Encoding"));
    }
}
