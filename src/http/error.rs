//! Engine error taxonomy.
//!
//! Errors fall in two families: the ones a response can still be written
//! for (malformed request, oversized header block) and the ones where the
//! connection is simply abandoned (I/O failure, timeout, TLS failure).

use std::time::Duration;

use thiserror::Error;

/// Error raised while reading, parsing or answering a request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request line, a header line or a structured header value is malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No header terminator was found within the configured limit.
    #[error("request header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    /// A single socket operation did not complete in time.
    #[error("socket operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The operation needs headers that were already written.
    #[error("response headers already sent")]
    HeadersAlreadySent,

    /// The context was closed before the operation.
    #[error("connection context is closed")]
    Closed,
}

impl HttpError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// Status code to answer with, if the peer should get a response at all.
    ///
    /// I/O level failures return `None`: the context is abandoned and the
    /// socket torn down without writing anything.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) | Self::HeaderTooLarge { .. } => Some(400),
            _ => None,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::HeaderTooLarge { .. } => "header_too_large",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
            Self::WebSocket(_) => "websocket",
            Self::HeadersAlreadySent => "headers_sent",
            Self::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_requests_map_to_400() {
        assert_eq!(HttpError::bad_request("x").status(), Some(400));
        assert_eq!(HttpError::HeaderTooLarge { limit: 10 }.status(), Some(400));
    }

    #[test]
    fn io_failures_are_abandoned() {
        let err = HttpError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(err.status(), None);
        assert_eq!(HttpError::Timeout(Duration::from_millis(150)).status(), None);
    }
}
