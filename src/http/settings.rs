//! Per-server settings shared by every connection context.

use std::sync::Arc;
use std::time::Duration;

use super::body::BodyDecoders;
use super::frame::MAX_HEADER_BYTES;
use super::session::{SessionIdSource, UuidSessionIds};
use crate::config::ServerConfig;
use crate::observability::profiling::Profiler;

/// Immutable settings handed to each [`Context`](super::Context) through an `Arc`.
#[derive(Clone)]
pub struct EngineSettings {
    pub server_name: String,
    pub default_charset: String,
    /// Negotiate gzip/deflate with clients that advertise it.
    pub compression: bool,
    pub send_timeout: Duration,
    pub receive_timeout: Duration,
    /// Wait for the first byte of a follow-up request on a kept-alive connection.
    pub idle_timeout: Duration,
    pub max_header_bytes: usize,
    pub read_chunk_bytes: usize,
    pub keep_alive_timeout_secs: u64,
    pub keep_alive_max: u32,
    pub session_ids: Arc<dyn SessionIdSource>,
    pub decoders: BodyDecoders,
    pub profiler: Option<Arc<Profiler>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_name: "h1serve".to_string(),
            default_charset: "utf-8".to_string(),
            compression: true,
            send_timeout: Duration::from_millis(150),
            receive_timeout: Duration::from_millis(150),
            idle_timeout: Duration::from_secs(15),
            max_header_bytes: MAX_HEADER_BYTES,
            read_chunk_bytes: 4096,
            keep_alive_timeout_secs: 15,
            keep_alive_max: 100,
            session_ids: Arc::new(UuidSessionIds),
            decoders: BodyDecoders::default(),
            profiler: None,
        }
    }
}

impl std::fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSettings")
            .field("server_name", &self.server_name)
            .field("send_timeout", &self.send_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("max_header_bytes", &self.max_header_bytes)
            .field("read_chunk_bytes", &self.read_chunk_bytes)
            .field("profiling", &self.profiler.is_some())
            .finish_non_exhaustive()
    }
}

impl EngineSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            server_name: config.http.server_name.clone(),
            default_charset: config.http.default_charset.clone(),
            compression: config.http.compression,
            send_timeout: Duration::from_millis(config.timeouts.send_ms),
            receive_timeout: Duration::from_millis(config.timeouts.receive_ms),
            idle_timeout: Duration::from_secs(config.http.keep_alive_timeout_secs),
            max_header_bytes: config.limits.max_header_bytes,
            read_chunk_bytes: config.limits.read_chunk_bytes,
            keep_alive_timeout_secs: config.http.keep_alive_timeout_secs,
            keep_alive_max: config.http.keep_alive_max,
            profiler: config
                .observability
                .profiling
                .then(|| Arc::new(Profiler::default())),
            ..Self::default()
        }
    }

    pub fn with_session_ids(mut self, source: impl SessionIdSource + 'static) -> Self {
        self.session_ids = Arc::new(source);
        self
    }

    pub fn with_decoders(mut self, decoders: BodyDecoders) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn with_profiler(mut self, profiler: Arc<Profiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }
}
