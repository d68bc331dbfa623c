//! Accept loop and per-connection exchange loop.
//!
//! # Responsibilities
//! - Accept connections under the listener's connection limit
//! - Run the optional TLS handshake under a timeout
//! - Drive read, dispatch and finish on each connection until it closes
//! - Hand upgraded sockets to the dispatcher's WebSocket handler
//! - Stop accepting on shutdown and wait for live connections to drain
//!
//! # Design Decisions
//! - One Tokio task per connection; the [`Context`] never crosses tasks
//! - Parse failures answer 400 and close; I/O failures close silently
//! - A dispatcher error answers 500 if nothing was written yet

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;

use super::context::Context;
use super::error::HttpError;
use super::settings::EngineSettings;
use super::websocket::WebSocket;
use crate::config::ServerConfig;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::net::stream::{Socket, Stream};
use crate::observability::metrics;
use crate::resilience::timeouts::io_timeout;

/// Application logic run for each parsed request.
pub trait Dispatcher<S: Socket = Stream>: Send + Sync + 'static {
    /// Produce the response for `ctx.request`.
    ///
    /// Anything left unfinished is completed by the engine after this
    /// returns.
    fn dispatch<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, Result<(), HttpError>>;

    /// Own an upgraded connection. The default sends a close frame.
    fn on_websocket(&self, mut socket: WebSocket<S>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _ = socket.stream.close(None).await;
        })
    }
}

/// Serve every exchange on one connection, then close it.
pub async fn serve_connection<S, D>(mut ctx: Context<S>, dispatcher: &D)
where
    S: Socket,
    D: Dispatcher<S> + ?Sized,
{
    loop {
        match ctx.read_request().await {
            Ok(true) => {}
            Ok(false) => {
                ctx.abandon().await;
                return;
            }
            Err(e) => {
                match e.status() {
                    Some(status) => {
                        tracing::debug!(connection_id = %ctx.id(), error = %e, "Rejecting malformed request");
                        metrics::record_bad_request(e.kind());
                        ctx.reject(status).await;
                    }
                    None => {
                        tracing::debug!(connection_id = %ctx.id(), error = %e, "Dropping connection");
                        ctx.abandon().await;
                    }
                }
                return;
            }
        }

        if ctx.request.is_websocket_request() {
            let id = ctx.id();
            match ctx.accept_websocket().await {
                Ok(socket) => dispatcher.on_websocket(socket).await,
                Err(e) => tracing::debug!(connection_id = %id, error = %e, "WebSocket handshake failed"),
            }
            return;
        }

        if let Err(e) = dispatcher.dispatch(&mut ctx).await {
            tracing::warn!(
                connection_id = %ctx.id(),
                path = %ctx.request.path,
                error = %e,
                "Dispatcher failed"
            );
            if !ctx.headers_sent() && ctx.is_open() {
                let _ = ctx.send_status(500).await;
            }
            ctx.close().await;
            return;
        }

        if let Err(e) = ctx.finish_response().await {
            tracing::debug!(connection_id = %ctx.id(), error = %e, "Failed to finish response");
            ctx.abandon().await;
            return;
        }

        if !ctx.can_reuse() {
            ctx.close().await;
            return;
        }
    }
}

/// HTTP/1.x server bound to one dispatcher.
pub struct HttpServer<D> {
    config: ServerConfig,
    settings: Arc<EngineSettings>,
    dispatcher: Arc<D>,
    tls: Option<TlsAcceptor>,
    tracker: ConnectionTracker,
}

impl<D: Dispatcher<Stream>> HttpServer<D> {
    pub fn new(config: ServerConfig, dispatcher: D) -> Self {
        let settings = Arc::new(EngineSettings::from_config(&config));
        Self {
            config,
            settings,
            dispatcher: Arc::new(dispatcher),
            tls: None,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Replace the settings derived from the config.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Terminate TLS on every accepted connection.
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn settings(&self) -> &Arc<EngineSettings> {
        &self.settings
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        let handshake_timeout = Duration::from_millis(self.config.timeouts.tls_handshake_ms);
        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };
            let (tcp, peer_addr, permit) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };
            let _ = tcp.set_nodelay(true);

            let guard = self.tracker.track();
            let settings = Arc::clone(&self.settings);
            let dispatcher = Arc::clone(&self.dispatcher);
            let tls = self.tls.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let stream = match tls {
                    Some(acceptor) => match io_timeout(handshake_timeout, acceptor.accept(tcp)).await {
                        Ok(stream) => Stream::Tls(Box::new(stream)),
                        Err(e) => {
                            tracing::debug!(peer_addr = %peer_addr, error = %e, "TLS handshake failed");
                            metrics::record_tls_failure();
                            return;
                        }
                    },
                    None => Stream::Plain(tcp),
                };
                let secure = stream.is_secure();
                let ctx = Context::new(guard.id(), stream, settings, secure).with_peer_addr(peer_addr);
                serve_connection(ctx, dispatcher.as_ref()).await;
                drop(guard);
            });
        }

        let deadline = Duration::from_secs(self.config.timeouts.shutdown_secs);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            deadline_secs = deadline.as_secs(),
            "Shutdown requested, draining connections"
        );
        if !self.tracker.wait_for_drain(deadline).await {
            tracing::warn!(
                active_connections = self.tracker.active_count(),
                "Drain deadline passed with connections still open"
            );
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    struct Hello;

    impl Dispatcher<DuplexStream> for Hello {
        fn dispatch<'a>(&'a self, ctx: &'a mut Context<DuplexStream>) -> BoxFuture<'a, Result<(), HttpError>> {
            Box::pin(async move {
                if ctx.request.path == "/fail" {
                    return Err(HttpError::bad_request("handler refused"));
                }
                let body = format!("hello {}", ctx.request.path);
                ctx.respond(200, "text/plain", body.as_bytes()).await
            })
        }
    }

    fn settings() -> Arc<EngineSettings> {
        Arc::new(EngineSettings {
            receive_timeout: Duration::from_secs(2),
            send_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_millis(300),
            compression: false,
            ..EngineSettings::default()
        })
    }

    async fn exchange(input: &'static [u8]) -> String {
        let (server, mut client) = duplex(64 * 1024);
        let ctx = Context::new(ConnectionId::new(), server, settings(), false);
        let task = tokio::spawn(async move { serve_connection(ctx, &Hello).await });
        client.write_all(input).await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        task.await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn back_to_back_requests_share_one_connection() {
        let wire = exchange(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert_eq!(wire.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(wire.contains("hello /a"));
        assert!(wire.contains("hello /b"));
    }

    #[tokio::test]
    async fn empty_declared_body_leaves_next_request_intact() {
        let wire = exchange(
            b"POST /a HTTP/1.1\r\nContent-Length: 0\r\n\r\nGET /b HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert_eq!(wire.matches("HTTP/1.1 200 OK").count(), 2, "{}", wire);
        assert!(wire.contains("hello /a"));
        assert!(wire.contains("hello /b"));
    }

    #[tokio::test]
    async fn declared_body_is_not_read_as_next_request() {
        let wire = exchange(
            b"POST /a HTTP/1.1\r\nContent-Length: 3\r\nContent-Type: text/plain\r\n\r\nabcGET /b HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert_eq!(wire.matches("HTTP/1.1 200 OK").count(), 2, "{}", wire);
        assert!(wire.contains("hello /b"));
    }

    #[tokio::test]
    async fn malformed_request_gets_400() {
        let wire = exchange(b"NONSENSE\r\n\r\n").await;
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn dispatcher_error_gets_500() {
        let wire = exchange(b"GET /fail HTTP/1.1\r\n\r\n").await;
        assert!(wire.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(wire.contains("Connection: close"));
    }
}
