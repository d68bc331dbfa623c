//! Timeout enforcement for socket operations.
//!
//! # Responsibilities
//! - Bound every individual socket read, write and handshake
//! - Report expiry as [`HttpError::Timeout`], distinct from I/O errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A zero duration disables the bound
//! - No deadline spans a whole request; only single operations are bounded

use std::future::Future;
use std::io;
use std::time::Duration;

use crate::http::HttpError;

/// Run an I/O future under `limit`.
pub async fn io_timeout<F, T>(limit: Duration, op: F) -> Result<T, HttpError>
where
    F: Future<Output = io::Result<T>>,
{
    if limit.is_zero() {
        return op.await.map_err(HttpError::from);
    }
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(HttpError::from),
        Err(_) => Err(HttpError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_operation_is_a_timeout() {
        let pending = std::future::pending::<io::Result<()>>();
        let err = io_timeout(Duration::from_millis(10), pending).await.unwrap_err();
        assert!(matches!(err, HttpError::Timeout(d) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn zero_disables_the_bound() {
        let value = io_timeout(Duration::ZERO, async { Ok::<_, io::Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn io_errors_pass_through() {
        let failing = async { Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionReset)) };
        let err = io_timeout(Duration::from_secs(1), failing).await.unwrap_err();
        assert!(matches!(err, HttpError::Io(_)));
    }
}
