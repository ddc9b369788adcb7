//! Error types for the registry client.
//!
//! Every failure the client can observe is reported through [`RegistryError`].
//! Transport failures, non-success statuses and undecodable payloads are kept
//! apart so that callers can tell "the registry said no" from "the registry
//! could not be reached" from "the registry answered with garbage".

use std::time::Duration;
use thiserror::Error;

/// Main error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    // Transport errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Operation was cancelled")]
    Cancelled,

    // Protocol errors
    #[error("Registry returned status {status_code} for {endpoint}")]
    Status {
        endpoint: String,
        status_code: u16,
        /// Response body, truncated, for diagnostics.
        body: String,
    },

    // Serialization errors
    #[error("Failed to decode registry response: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Failed to encode request payload: {message}")]
    Encode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Input errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid health check: {message}")]
    InvalidHealthCheck { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Longest response body kept in a [`RegistryError::Status`].
const MAX_BODY_SNIPPET: usize = 1024;

impl RegistryError {
    /// Build a status error, keeping at most a short prefix of the body.
    pub fn status(endpoint: impl Into<String>, status_code: u16, body: &[u8]) -> Self {
        let snippet = &body[..body.len().min(MAX_BODY_SNIPPET)];
        RegistryError::Status {
            endpoint: endpoint.into(),
            status_code,
            body: String::from_utf8_lossy(snippet).into_owned(),
        }
    }

    /// Build a validation error for an input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Status code returned by the registry, if this is a protocol error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RegistryError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Register and deregister are idempotent, so any transient failure may be
    /// retried without changing what the registry ends up holding.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Transport { .. } | RegistryError::Timeout(_) => true,
            RegistryError::Status { status_code, .. } => {
                matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Whether the request never produced a response from the registry.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RegistryError::Transport { .. } | RegistryError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::validation("service_name", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Validation error for service_name: must not be empty"
        );
    }

    #[test]
    fn test_status_error_keeps_code_and_truncates_body() {
        let body = vec![b'x'; 4096];
        let err = RegistryError::status("/v1/agent/service/register", 500, &body);
        assert_eq!(err.status_code(), Some(500));
        match err {
            RegistryError::Status { body, endpoint, .. } => {
                assert_eq!(body.len(), MAX_BODY_SNIPPET);
                assert_eq!(endpoint, "/v1/agent/service/register");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(RegistryError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(RegistryError::status("/x", 503, b"").is_retryable());
        assert!(!RegistryError::status("/x", 404, b"").is_retryable());
        assert!(!RegistryError::Cancelled.is_retryable());
        assert!(!RegistryError::validation("port", "zero").is_retryable());
    }

    #[test]
    fn test_decode_error_keeps_serde_source() {
        let err = crate::models::decode_health_entries(b"{").unwrap_err();
        assert!(matches!(err, RegistryError::Decode { source: Some(_), .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_transport());
        assert!(!err.is_retryable());
    }
}
