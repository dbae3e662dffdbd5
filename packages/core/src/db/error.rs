//! Local Store Error Types
//!
//! This module defines error types for local persistence operations. The
//! taxonomy drives the retry classification: a failed transaction is
//! transient and retried; quota exhaustion, an unavailable store, and a
//! missing key are permanent and surface immediately.

use crate::retry::Retryable;
use std::path::PathBuf;
use thiserror::Error;

/// Local store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is not opened or not accessible in this execution context
    #[error("Local store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Storage capacity exhausted — never retried
    #[error("Local store quota exceeded: {context}")]
    QuotaExceeded { context: String },

    /// A specific read or write failed — retried with backoff
    #[error("Store transaction failed: {context}")]
    TransactionFailed { context: String },

    /// Referenced key absent — typed failure, not retried
    #[error("Not found in local store: {key}")]
    NotFound { key: String },

    /// A persisted row failed to deserialize — surfaced, not retried
    /// (re-reading cannot un-corrupt a row)
    #[error("Failed to decode stored record: {context}")]
    Serialization { context: String },

    /// Failed to establish the database connection
    #[error("Failed to open local store at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },
}

impl StoreError {
    /// Create an unavailable-store error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a quota-exceeded error
    pub fn quota_exceeded(context: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            context: context.into(),
        }
    }

    /// Create a transaction-failed error with context
    pub fn transaction(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    /// Create a not-found error for a key
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a serialization error with context
    pub fn serialization(context: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
        }
    }

    /// Classify a libsql failure for an operation.
    ///
    /// Disk-full conditions are quota errors (never retried); everything else
    /// is a transaction failure (retried).
    pub fn from_libsql(context: &str, err: libsql::Error) -> Self {
        let message = err.to_string();
        if message.contains("disk is full") || message.contains("database or disk is full") {
            Self::quota_exceeded(format!("{}: {}", context, message))
        } else {
            Self::transaction(format!("{}: {}", context, message))
        }
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransactionFailed { .. })
    }
}
