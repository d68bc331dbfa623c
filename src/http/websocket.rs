//! WebSocket upgrade handshake.
//!
//! # Responsibilities
//! - Compute the `Sec-WebSocket-Accept` key (RFC 6455 §4.2.2)
//! - Render the literal `101 Switching Protocols` response
//! - Hand the socket to a framed WebSocket stream
//!
//! # Data Flow
//! ```text
//! GET + Sec-WebSocket-Key → 101 written on the raw socket → WebSocketStream
//! ```
//! After the swap the request/response loop no longer applies; the
//! dispatcher's WebSocket handler owns the connection.

use base64::Engine;
use sha1::{Digest, Sha1};
use tokio_tungstenite::WebSocketStream;

use super::request::HttpRequest;

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `Base64(SHA1(key + GUID))`
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// First subprotocol offered by the client, if any.
pub fn requested_protocol(request: &HttpRequest) -> Option<String> {
    request
        .headers
        .get("Sec-WebSocket-Protocol")
        .and_then(|offer| offer.split(',').map(str::trim).find(|p| !p.is_empty()))
        .map(str::to_string)
}

pub fn handshake_response(server_name: &str, accept: &str, protocol: Option<&str>) -> String {
    let mut out = format!(
        "HTTP/1.1 101 Switching Protocols\r\nConnection:Upgrade\r\nUpgrade:websocket\r\nServer: {}\r\nSec-WebSocket-Accept: {}\r\n",
        server_name, accept
    );
    if let Some(protocol) = protocol {
        out.push_str("Sec-WebSocket-Protocol: ");
        out.push_str(protocol);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}

/// An upgraded connection.
pub struct WebSocket<S> {
    /// The request that asked for the upgrade.
    pub request: HttpRequest,
    pub session_id: String,
    /// Subprotocol echoed back to the client.
    pub protocol: Option<String>,
    pub secure: bool,
    pub stream: WebSocketStream<S>,
}

impl<S> std::fmt::Debug for WebSocket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("path", &self.request.path)
            .field("session_id", &self.session_id)
            .field("protocol", &self.protocol)
            .field("secure", &self.secure)
            .finish()
    }
}
