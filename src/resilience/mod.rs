//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! socket read / write / TLS handshake
//!     → timeouts.rs (per-operation bound)
//!     → on expiry: the connection is abandoned, nothing is retried
//! ```

pub mod timeouts;
