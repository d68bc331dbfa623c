//! HTTP/1.x protocol engine.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (accept loop, one task per connection)
//!     → context.rs (read loop, frame.rs finds the end of the header block)
//!     → request.rs (parse request line, headers, cookies, query)
//!     → body.rs (spool body to a temp file, pick a decoder)
//!     → Dispatcher (application writes the response)
//!     → response.rs (status line + headers, written once)
//!     → pipeline.rs (compression inside, chunked framing outside)
//!     → close, or back to context.rs for the next request
//!
//! Upgrade requests:
//!     context.rs → websocket.rs (101 handshake) → Dispatcher::on_websocket
//! ```

pub mod body;
pub mod context;
pub mod cookie;
pub mod echo;
pub mod error;
pub mod frame;
pub mod headers;
pub mod pipeline;
pub mod query;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod settings;
pub mod websocket;

pub use body::{BodyDecoder, BodyDecoders};
pub use context::{Context, ContextState};
pub use cookie::Cookie;
pub use echo::EchoDispatcher;
pub use error::HttpError;
pub use headers::WebHeaderCollection;
pub use query::{QueryValue, QueryValueCollection};
pub use request::{HttpRequest, HttpVersion};
pub use response::HttpResponse;
pub use server::{serve_connection, Dispatcher, HttpServer};
pub use session::SessionIdSource;
pub use settings::EngineSettings;
pub use websocket::WebSocket;
