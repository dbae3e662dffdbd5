//! Sync Services
//!
//! The engine's business logic:
//!
//! - [`CardService`] - per-operation orchestrator (`save_card`, `load_card`)
//! - [`OfflineQueue`] / [`OfflineQueueWorker`] - durable retry queue for
//!   remote mutations
//! - [`CacheManager`] - background reconciler between local and remote state
//!
//! Services coordinate the local store and remote client; neither store
//! knows the other exists.

pub mod cache_manager;
pub mod card_service;
pub mod error;
pub mod offline_queue;

pub use cache_manager::{
    CacheManager, CardConflict, ConflictKind, ReconcileReport, ReconcilerHandle, ResolveReport,
};
pub use card_service::{CardService, SaveOutcome, SyncStatus};
pub use error::SyncError;
pub use offline_queue::{
    OfflineQueue, OfflineQueueWorker, ProcessOutcome, QueueStats, QueueWaker,
};

use crate::db::CardStore;
use crate::models::{Card, RemoteFileMeta};
use crate::remote::RemoteStore;
use crate::utils::markdown;

/// Download a remote card file, parse it, and overwrite the local copy.
///
/// The stored card's `modified` is clamped up to the remote listing's
/// timestamp: an upload can land with a listing time slightly ahead of the
/// front-matter time, and without the clamp every subsequent pass would
/// re-download an identical document.
pub(crate) async fn fetch_remote_card(
    store: &dyn CardStore,
    remote: &dyn RemoteStore,
    meta: &RemoteFileMeta,
) -> Result<Card, SyncError> {
    let reference = meta.download_ref.as_deref().unwrap_or(meta.path.as_str());
    let content = remote.download_file(reference).await?;
    let mut card = markdown::parse(&content)?;
    if meta.modified > card.meta.modified {
        card.meta.modified = meta.modified;
    }
    store.put_card(card.clone()).await?;
    Ok(card)
}
