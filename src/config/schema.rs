//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::frame::MAX_HEADER_BYTES;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Per-operation socket timeouts.
    pub timeouts: TimeoutConfig,

    /// Size limits for request parsing.
    pub limits: LimitsConfig,

    /// Response defaults and keep-alive policy.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeouts for single socket operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on each socket write in milliseconds (0 disables).
    pub send_ms: u64,

    /// Bound on each socket read in milliseconds (0 disables).
    pub receive_ms: u64,

    /// TLS handshake timeout in milliseconds.
    pub tls_handshake_ms: u64,

    /// How long shutdown waits for open connections, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_ms: 150,
            receive_ms: 150,
            tls_handshake_ms: 5_000,
            shutdown_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted header block, terminator included.
    pub max_header_bytes: usize,

    /// Upper bound on a single body read.
    pub read_chunk_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: MAX_HEADER_BYTES,
            read_chunk_bytes: 4096,
        }
    }
}

/// Response defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Value of the `Server` header.
    pub server_name: String,

    /// Charset appended to a `Content-Type` that has none.
    pub default_charset: String,

    /// Negotiate gzip/deflate response bodies.
    pub compression: bool,

    /// Advertised in `Keep-Alive: timeout=..`; also the idle wait between requests.
    pub keep_alive_timeout_secs: u64,

    /// Requests served on one connection before it is closed.
    pub keep_alive_max: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_name: "h1serve".to_string(),
            default_charset: "utf-8".to_string(),
            compression: true,
            keep_alive_timeout_secs: 15,
            keep_alive_max: 100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Record per host+path timings.
    pub profiling: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            profiling: false,
        }
    }
}
