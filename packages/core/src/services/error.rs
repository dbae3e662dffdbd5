//! Service Layer Error Types
//!
//! High-level error type for the sync services, chaining the store and
//! remote taxonomies. The service layer never converts a typed failure into
//! a stringly error — callers can always match on the underlying class.

use crate::db::StoreError;
use crate::models::ValidationError;
use crate::remote::RemoteError;
use crate::utils::markdown::FormatError;
use thiserror::Error;

/// Sync service operation errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// Local persistence failed
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// Remote store call failed
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Card failed validation before persisting
    #[error("Card validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A downloaded document could not be parsed
    #[error("Card format error: {0}")]
    Format(#[from] FormatError),

    /// A queue operation could not be carried out
    #[error("Queue operation failed: {context}")]
    QueueOperationFailed { context: String },

    /// Referenced sync task does not exist
    #[error("Sync task not found: {id}")]
    TaskNotFound { id: String },
}

impl SyncError {
    /// Create a queue operation failure with context
    pub fn queue(context: impl Into<String>) -> Self {
        Self::QueueOperationFailed {
            context: context.into(),
        }
    }

    /// Create a task-not-found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
}
