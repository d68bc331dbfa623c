//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check that TLS material is readable before the listener binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::http::frame::HEADER_TERMINATOR;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed config, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if let Some(tls) = &config.listener.tls {
        for (field, path) in [("listener.tls.cert_path", &tls.cert_path), ("listener.tls.key_path", &tls.key_path)] {
            if !Path::new(path).is_file() {
                errors.push(ValidationError::new(field, format!("{} is not a readable file", path)));
            }
        }
    }

    if config.limits.max_header_bytes < HEADER_TERMINATOR.len() {
        errors.push(ValidationError::new(
            "limits.max_header_bytes",
            "must hold at least a header terminator",
        ));
    }
    if config.limits.read_chunk_bytes == 0 {
        errors.push(ValidationError::new("limits.read_chunk_bytes", "must be greater than 0"));
    }

    if config.http.server_name.trim().is_empty() {
        errors.push(ValidationError::new("http.server_name", "must not be empty"));
    }
    if config.http.server_name.contains(['\r', '\n']) {
        errors.push(ValidationError::new("http.server_name", "must not contain line breaks"));
    }
    if config.http.default_charset.trim().is_empty() {
        errors.push(ValidationError::new("http.default_charset", "must not be empty"));
    }
    if config.http.keep_alive_max == 0 {
        errors.push(ValidationError::new("http.keep_alive_max", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn every_violation_is_reported() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.limits.read_chunk_bytes = 0;
        config.http.server_name = "bad\r\nname".to_string();
        config.listener.tls = Some(TlsConfig {
            cert_path: "/definitely/missing/cert.pem".to_string(),
            key_path: "/definitely/missing/key.pem".to_string(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            [
                "listener.bind_address",
                "listener.tls.cert_path",
                "listener.tls.key_path",
                "limits.read_chunk_bytes",
                "http.server_name",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bogus".to_string();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert_eq!(validate_config(&config).unwrap_err()[0].field, "observability.metrics_address");
    }
}
