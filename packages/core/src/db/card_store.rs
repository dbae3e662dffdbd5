//! CardStore Trait - Local Persistence Abstraction
//!
//! This module defines the `CardStore` trait that abstracts local persistence
//! for the sync engine. The trait covers the three durable collections —
//! cards, cached remote-file metadata, and the sync queue — so business logic
//! never touches SQL directly.
//!
//! # Architecture
//!
//! - **Abstraction point**: between the sync services and the storage backend
//! - **Independent copies**: every read returns an owned value; no component
//!   shares mutable in-memory references across concurrent operations
//! - **Capability injection**: environments without local persistence get
//!   [`UnavailableStore`], a null object whose every call fails with
//!   `StoreError::Unavailable` — the engine itself carries no hidden
//!   environment branching
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; futures may move between threads.

use crate::db::error::StoreError;
use crate::models::{Card, RemoteFileMeta, SyncTask, SyncTaskStatus};
use async_trait::async_trait;

/// Abstraction over the local persistence layer.
///
/// All methods are async and return typed `StoreError`s. Implementations are
/// expected to wrap individual operations in the shared retry helper;
/// `Unavailable`, `QuotaExceeded`, and `NotFound` short-circuit, transaction
/// failures retry with backoff.
#[async_trait]
pub trait CardStore: Send + Sync {
    //
    // CARD OPERATIONS
    //

    /// Insert or overwrite a card (keyed by `meta.id`)
    async fn put_card(&self, card: Card) -> Result<(), StoreError>;

    /// Get a card by id; `Ok(None)` if absent (absence is not an error here —
    /// callers decide whether a miss matters)
    async fn get_card(&self, id: &str) -> Result<Option<Card>, StoreError>;

    /// All stored cards, most recently modified first
    async fn list_cards(&self) -> Result<Vec<Card>, StoreError>;

    /// Delete a card by id.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no card with that id exists.
    async fn delete_card(&self, id: &str) -> Result<(), StoreError>;

    //
    // REMOTE FILE METADATA (cached cloud listing)
    //

    /// Insert or overwrite one remote-file descriptor (keyed by path)
    async fn put_remote_file(&self, meta: RemoteFileMeta) -> Result<(), StoreError>;

    /// Look up the cached descriptor for a file name (`<card id>.md`)
    async fn get_remote_file_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RemoteFileMeta>, StoreError>;

    /// All cached remote-file descriptors
    async fn list_remote_files(&self) -> Result<Vec<RemoteFileMeta>, StoreError>;

    /// Remove one cached descriptor by path (idempotent)
    async fn delete_remote_file(&self, path: &str) -> Result<(), StoreError>;

    /// Replace the entire cached listing with a fresh one (the side effect
    /// of a successful remote `list_files`)
    async fn replace_remote_files(&self, files: Vec<RemoteFileMeta>) -> Result<(), StoreError>;

    //
    // SYNC QUEUE
    //

    /// Append a task to the queue
    async fn enqueue_task(&self, task: SyncTask) -> Result<(), StoreError>;

    /// Fetch one task by id.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the task does not exist.
    async fn get_task(&self, id: &str) -> Result<SyncTask, StoreError>;

    /// Pending tasks in FIFO order (by enqueue time)
    async fn list_pending_tasks(&self) -> Result<Vec<SyncTask>, StoreError>;

    /// Every queued task regardless of status, FIFO order
    async fn list_tasks(&self) -> Result<Vec<SyncTask>, StoreError>;

    /// Persist a task's current state (status, attempts) — the queue is the
    /// only component that mutates tasks.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the task does not exist.
    async fn update_task(&self, task: &SyncTask) -> Result<(), StoreError>;

    /// Remove tasks; restricted to one status when given, otherwise all.
    /// Returns the number of removed tasks.
    async fn clear_tasks(&self, status: Option<SyncTaskStatus>) -> Result<u64, StoreError>;
}

/// Null-object store for execution contexts without local persistence.
///
/// Injected at construction where a real store cannot be opened (e.g. a
/// non-interactive context); every operation fails fast with
/// `StoreError::Unavailable`, which the retry helper never retries.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    pub fn new() -> Self {
        Self
    }

    fn err<T>() -> Result<T, StoreError> {
        Err(StoreError::unavailable(
            "local persistence is not available in this execution context",
        ))
    }
}

#[async_trait]
impl CardStore for UnavailableStore {
    async fn put_card(&self, _card: Card) -> Result<(), StoreError> {
        Self::err()
    }

    async fn get_card(&self, _id: &str) -> Result<Option<Card>, StoreError> {
        Self::err()
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        Self::err()
    }

    async fn delete_card(&self, _id: &str) -> Result<(), StoreError> {
        Self::err()
    }

    async fn put_remote_file(&self, _meta: RemoteFileMeta) -> Result<(), StoreError> {
        Self::err()
    }

    async fn get_remote_file_by_name(
        &self,
        _name: &str,
    ) -> Result<Option<RemoteFileMeta>, StoreError> {
        Self::err()
    }

    async fn list_remote_files(&self) -> Result<Vec<RemoteFileMeta>, StoreError> {
        Self::err()
    }

    async fn delete_remote_file(&self, _path: &str) -> Result<(), StoreError> {
        Self::err()
    }

    async fn replace_remote_files(&self, _files: Vec<RemoteFileMeta>) -> Result<(), StoreError> {
        Self::err()
    }

    async fn enqueue_task(&self, _task: SyncTask) -> Result<(), StoreError> {
        Self::err()
    }

    async fn get_task(&self, _id: &str) -> Result<SyncTask, StoreError> {
        Self::err()
    }

    async fn list_pending_tasks(&self) -> Result<Vec<SyncTask>, StoreError> {
        Self::err()
    }

    async fn list_tasks(&self) -> Result<Vec<SyncTask>, StoreError> {
        Self::err()
    }

    async fn update_task(&self, _task: &SyncTask) -> Result<(), StoreError> {
        Self::err()
    }

    async fn clear_tasks(&self, _status: Option<SyncTaskStatus>) -> Result<u64, StoreError> {
        Self::err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = UnavailableStore::new();
        assert!(matches!(
            store.list_cards().await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.get_card("any").await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.list_pending_tasks().await,
            Err(StoreError::Unavailable { .. })
        ));
    }
}
