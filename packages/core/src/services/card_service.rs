//! Card Service - Sync Orchestrator
//!
//! The per-operation entry point the API layer calls. `save_card` and
//! `load_card` sequence the local store and the remote client, falling back
//! to the offline queue when the remote side fails.
//!
//! # Degraded-but-not-failed saves
//!
//! A save whose local write succeeds never surfaces a remote failure as an
//! error: the card is durable on device, the remote write is queued, and the
//! outcome's [`SyncStatus`] tells the UI the truth without blocking the
//! user's workflow.

use crate::config::SyncConfig;
use crate::db::CardStore;
use crate::models::{Card, RemoteFileMeta, SyncOperation};
use crate::remote::RemoteStore;
use crate::services::cache_manager::{CacheManager, ReconcileReport};
use crate::services::error::SyncError;
use crate::services::fetch_remote_card;
use crate::services::offline_queue::{OfflineQueue, QueueStats};
use crate::utils::markdown;
use std::sync::Arc;

/// True remote state of a card after an operation — the UI's status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Local and remote writes both succeeded
    Synced,
    /// Remote write queued, a drain pass will retry it
    Pending,
    /// Local write succeeded; remote write failed and was queued
    LocalOnly,
    /// Local write succeeded but the failure could not even be queued
    Error,
}

/// Outcome of a save: `ok` reflects local durability, `status` the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub ok: bool,
    pub status: SyncStatus,
}

/// Sync orchestrator over the local store, remote client, offline queue,
/// and reconciler
pub struct CardService {
    store: Arc<dyn CardStore>,
    remote: Arc<dyn RemoteStore>,
    queue: Arc<OfflineQueue>,
    reconciler: Arc<CacheManager>,
    config: SyncConfig,
}

impl CardService {
    pub fn new(
        store: Arc<dyn CardStore>,
        remote: Arc<dyn RemoteStore>,
        queue: Arc<OfflineQueue>,
        reconciler: Arc<CacheManager>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            queue,
            reconciler,
            config,
        }
    }

    /// Save a card: local store first (the UI always gets an immediate
    /// durable copy), then best-effort remote upload.
    ///
    /// # Errors
    ///
    /// Only local failures error out. A remote failure enqueues a sync task
    /// and reports `SyncStatus::LocalOnly`.
    pub async fn save_card(&self, card: Card) -> Result<SaveOutcome, SyncError> {
        card.validate()?;

        let is_new = self.store.get_card(&card.meta.id).await?.is_none();
        self.store.put_card(card.clone()).await?;

        let content = markdown::serialize(&card);
        let path = self.config.remote_path_for(&card.remote_name());

        match self.remote.upload_at_path(&path, &content, true).await {
            Ok(()) => Ok(SaveOutcome {
                ok: true,
                status: SyncStatus::Synced,
            }),
            Err(e) => {
                tracing::warn!(
                    "remote upload failed for card {}, queueing for later: {}",
                    card.meta.id,
                    e
                );
                let operation = if is_new {
                    SyncOperation::Create
                } else {
                    SyncOperation::Update
                };
                match self.queue.enqueue_card(operation, card).await {
                    Ok(_) => Ok(SaveOutcome {
                        ok: true,
                        status: SyncStatus::LocalOnly,
                    }),
                    Err(queue_err) => {
                        // Local durability was achieved; report the degraded
                        // state instead of failing the save.
                        tracing::error!(
                            "could not queue failed upload: {} (original: {})",
                            queue_err,
                            e
                        );
                        Ok(SaveOutcome {
                            ok: true,
                            status: SyncStatus::Error,
                        })
                    }
                }
            }
        }
    }

    /// Load a card, serving the local copy when it is at least as fresh as
    /// the cached remote listing for that file (no network call on a hit).
    ///
    /// On a miss, downloads from the remote, overwrites the local copy, and
    /// returns the fresh card. A failed download falls back to the cached
    /// copy when one exists, otherwise reports absent.
    pub async fn load_card(&self, id: &str) -> Result<Option<Card>, SyncError> {
        let local = self.store.get_card(id).await?;
        let name = format!("{}.md", id);
        let cached_meta = self.store.get_remote_file_by_name(&name).await?;

        if let (Some(local), Some(meta)) = (&local, &cached_meta) {
            if local.meta.modified >= meta.modified {
                tracing::debug!("cache hit for card {}", id);
                return Ok(Some(local.clone()));
            }
        }
        if local.is_some() && cached_meta.is_none() {
            // Nothing known to be newer remotely
            return Ok(local);
        }

        // Local copy is stale or absent: find the remote file. With no
        // cached metadata, refresh the listing once before concluding the
        // card does not exist anywhere.
        let meta = match cached_meta {
            Some(meta) => Some(meta),
            None => match self.remote.list_files().await {
                Ok(files) => files.into_iter().find(|f| f.name == name),
                Err(e) => {
                    tracing::warn!("remote listing failed while loading {}: {}", id, e);
                    None
                }
            },
        };
        let Some(meta) = meta else {
            return Ok(local);
        };

        match fetch_remote_card(&*self.store, &*self.remote, &meta).await {
            Ok(card) => Ok(Some(card)),
            Err(e) => {
                tracing::warn!(
                    "download failed for card {}, serving cached copy: {}",
                    id,
                    e
                );
                Ok(local)
            }
        }
    }

    /// Delete a card locally and queue the remote intent.
    ///
    /// The remote backend exposes no delete endpoint, so the queued task
    /// records the limitation; the outcome is always local-only.
    pub async fn delete_card(&self, id: &str) -> Result<SaveOutcome, SyncError> {
        self.store.delete_card(id).await?;
        match self.queue.enqueue_delete(id.to_string()).await {
            Ok(_) => Ok(SaveOutcome {
                ok: true,
                status: SyncStatus::LocalOnly,
            }),
            Err(e) => {
                tracing::error!("could not queue delete for card {}: {}", id, e);
                Ok(SaveOutcome {
                    ok: true,
                    status: SyncStatus::Error,
                })
            }
        }
    }

    /// Live remote listing (refreshes the local metadata cache as a side
    /// effect of the client call)
    pub async fn list_remote_files(&self) -> Result<Vec<RemoteFileMeta>, SyncError> {
        Ok(self.remote.list_files().await?)
    }

    /// Queue contents by status, for the UI's sync indicator
    pub async fn queue_stats(&self) -> Result<QueueStats, SyncError> {
        self.queue.stats().await
    }

    /// Run one reconciliation pass on demand
    pub async fn trigger_reconciliation(&self) -> Result<ReconcileReport, SyncError> {
        self.reconciler.reconcile().await
    }
}
