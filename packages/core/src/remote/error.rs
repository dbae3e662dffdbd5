//! Remote Store Error Types
//!
//! Classified errors for the cloud backend client. Classification drives
//! retry behavior: network-class failures (5xx, transport, timeout) are
//! transient and retried with backoff; auth failures and other 4xx are
//! permanent and surface immediately — retrying without credentials (or a
//! bad request) cannot succeed.

use crate::retry::Retryable;
use thiserror::Error;

/// Remote store operation errors
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Missing or rejected credential (401/403) — not retried
    #[error("Remote authentication failed: {context}")]
    Auth { context: String },

    /// Transport failure, timeout, or 5xx — retried with backoff
    #[error("Remote network error: {context}")]
    Network { context: String },

    /// Any other 4xx — treated as a caller bug, not retried
    #[error("Remote request rejected (HTTP {status}): {context}")]
    Http { status: u16, context: String },

    /// Response body failed validation at the client boundary — not retried
    #[error("Invalid remote response: {context}")]
    InvalidResponse { context: String },

    /// The backend does not expose this operation
    #[error("Remote backend does not support {operation}")]
    Unsupported { operation: String },
}

impl RemoteError {
    pub fn auth(context: impl Into<String>) -> Self {
        Self::Auth {
            context: context.into(),
        }
    }

    pub fn network(context: impl Into<String>) -> Self {
        Self::Network {
            context: context.into(),
        }
    }

    pub fn http(status: u16, context: impl Into<String>) -> Self {
        Self::Http {
            status,
            context: context.into(),
        }
    }

    pub fn invalid_response(context: impl Into<String>) -> Self {
        Self::InvalidResponse {
            context: context.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::auth(format!("HTTP {}: {}", status, context.into())),
            500..=599 => Self::network(format!("HTTP {}: {}", status, context.into())),
            _ => Self::http(status, context.into()),
        }
    }

    /// Classify a reqwest transport error. Timeouts are treated identically
    /// to network errors for retry purposes.
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::network(format!("{}: {}", context, err))
        } else if err.is_decode() {
            Self::invalid_response(format!("{}: {}", context, err))
        } else {
            Self::network(format!("{}: {}", context, err))
        }
    }
}

impl Retryable for RemoteError {
    fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Network { .. })
    }
}
