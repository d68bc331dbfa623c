//! HTTP/1.x server engine over raw TCP and TLS sockets.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ net::tls (optional) ──▶ http::server
//!                                                              │
//!                                                              ▼
//!                          ┌──────────────── http::context ───────────────┐
//!                          │ frame → request → body → Dispatcher          │
//!                          │ response head → pipeline (gzip/deflate,      │
//!                          │ chunked) → close / keep-alive / WebSocket    │
//!                          └──────────────────────────────────────────────┘
//!
//!     Cross-cutting: config, observability (logs, metrics, profiling),
//!     lifecycle (signals, shutdown), resilience (per-operation timeouts)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::ServerConfig;
pub use http::{Context, Dispatcher, EchoDispatcher, HttpError, HttpServer};
pub use lifecycle::Shutdown;
