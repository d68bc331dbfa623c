//! Default dispatcher for the binary: reflects the request back.
//!
//! `GET /_profile` answers the profiler summary as JSON when profiling is on.
//! WebSocket text and binary messages are sent back unchanged.

use std::fmt::Write;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncReadExt;
use tokio_tungstenite::tungstenite::Message;

use super::context::Context;
use super::error::HttpError;
use super::request::HttpRequest;
use super::server::Dispatcher;
use super::websocket::WebSocket;
use crate::net::stream::Socket;

pub const PROFILE_PATH: &str = "/_profile";

/// Echoes each parsed request as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoDispatcher;

/// Plain-text rendering of everything the parser extracted.
pub fn describe_request(request: &HttpRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} HTTP/{}", request.method, request.raw_url, request.version);
    let _ = writeln!(out, "path: {}", request.path);
    for (name, value) in request.headers.iter() {
        let _ = writeln!(out, "header {}: {}", name, value);
    }
    for cookie in &request.cookies {
        let _ = writeln!(out, "cookie {}={}", cookie.name, cookie.value);
    }
    for field in request.get.iter() {
        let _ = writeln!(out, "query {}={}", field.name(), field.values().join(","));
    }
    for field in request.post.iter() {
        let _ = writeln!(out, "form {}={}", field.name(), field.values().join(","));
    }
    out
}

impl<S: Socket> Dispatcher<S> for EchoDispatcher {
    fn dispatch<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, Result<(), HttpError>> {
        Box::pin(async move {
            if ctx.request.path == PROFILE_PATH {
                if let Some(profiler) = ctx.settings().profiler.clone() {
                    let body = serde_json::to_vec_pretty(&profiler.summary())
                        .map_err(|e| HttpError::Io(e.into()))?;
                    return ctx.respond(200, "application/json", &body).await;
                }
            }

            let mut text = describe_request(&ctx.request);
            let _ = writeln!(text, "session: {}", ctx.session_id());
            let mut raw = Vec::new();
            if let Some(input) = ctx.request.input.as_mut() {
                input.read_to_end(&mut raw).await?;
            }
            ctx.respond(200, "text/plain", text.as_bytes()).await?;
            if !raw.is_empty() {
                ctx.write_str("\n").await?;
                ctx.write(&raw).await?;
            }
            Ok(())
        })
    }

    fn on_websocket(&self, socket: WebSocket<S>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let WebSocket {
                request, mut stream, ..
            } = socket;
            while let Some(message) = stream.next().await {
                let reply = match message {
                    Ok(msg @ (Message::Text(_) | Message::Binary(_))) => msg,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(path = %request.path, error = %e, "WebSocket read failed");
                        break;
                    }
                };
                if let Err(e) = stream.send(reply).await {
                    tracing::debug!(path = %request.path, error = %e, "WebSocket write failed");
                    break;
                }
            }
            let _ = stream.close(None).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::parse_request_head;

    #[test]
    fn description_lists_parsed_fields() {
        let request = parse_request_head(
            b"GET /p%20q?x=1&x=2&flag HTTP/1.1\r\nHost: h\r\nCookie: a=1\r\n\r\n",
        )
        .unwrap();
        let text = describe_request(&request);
        assert!(text.starts_with("GET /p%20q?x=1&x=2&flag HTTP/1.1\n"));
        assert!(text.contains("path: /p q\n"));
        assert!(text.contains("header Host: h\n"));
        assert!(text.contains("cookie a=1\n"));
        assert!(text.contains("query x=1,2\n"));
        assert!(text.contains("query flag=true\n"));
    }
}
