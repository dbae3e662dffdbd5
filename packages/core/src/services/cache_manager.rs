//! Cache Manager
//!
//! Background reconciler between the local store and the remote listing.
//! One pass compares every local card against the remote state, downloads
//! what is stale or missing locally, and evicts cards the remote no longer
//! has — but only past a validation window, so a card created offline and
//! not yet pushed is never deleted.
//!
//! # Concurrency
//!
//! Passes are mutually exclusive with each other (in-flight guard; a
//! scheduled pass is skipped, not queued) but run concurrently with
//! orchestrator saves and queue drains. The remote-wins-if-newer rule is
//! idempotent under racing local writes: whichever write lands last in the
//! local store is the tie outcome.

use crate::config::SyncConfig;
use crate::db::CardStore;
use crate::models::{Card, RemoteFileMeta};
use crate::remote::RemoteStore;
use crate::services::error::SyncError;
use crate::services::fetch_remote_card;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How a local/remote pair's timestamps relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    LocalNewer,
    RemoteNewer,
    /// Difference within the same-time tolerance — treated as equal to
    /// absorb clock-skew noise, neither side overwritten
    SameTime,
}

/// One detected local/remote divergence
#[derive(Debug, Clone, PartialEq)]
pub struct CardConflict {
    pub card_id: String,
    pub local_modified: DateTime<Utc>,
    pub remote_modified: DateTime<Utc>,
    pub kind: ConflictKind,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// False when the pass was skipped (no credential, or one in flight)
    pub ran: bool,
    /// Cards downloaded from the remote (stale local or missing local)
    pub downloaded: u64,
    /// Local cards evicted for lacking a remote counterpart past the window
    pub evicted: u64,
    /// Local-only cards kept because they are within the validation window
    pub kept_unpushed: u64,
    /// Per-file failures that did not abort the pass
    pub errors: u64,
}

/// Result of one conflict-resolution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub uploaded: u64,
    pub downloaded: u64,
    pub left_untouched: u64,
}

/// Periodic reconciler between local store and remote listing
pub struct CacheManager {
    store: Arc<dyn CardStore>,
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
    in_flight: AtomicBool,
}

struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CacheManager {
    pub fn new(store: Arc<dyn CardStore>, remote: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            store,
            remote,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    fn same_time_tolerance(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.same_time_tolerance)
            .unwrap_or_else(|_| chrono::Duration::milliseconds(1000))
    }

    fn classify(&self, local: DateTime<Utc>, remote: DateTime<Utc>) -> ConflictKind {
        let delta = local - remote;
        if delta.abs() <= self.same_time_tolerance() {
            ConflictKind::SameTime
        } else if delta > chrono::Duration::zero() {
            ConflictKind::LocalNewer
        } else {
            ConflictKind::RemoteNewer
        }
    }

    /// Run one reconciliation pass.
    ///
    /// A remote listing failure aborts the whole pass (logged, surfaced, not
    /// retried inline — the next scheduled pass retries). Per-file download
    /// failures are logged and counted without aborting the rest.
    pub async fn reconcile(&self) -> Result<ReconcileReport, SyncError> {
        if !self.config.has_credentials() {
            tracing::debug!("no remote credential configured, skipping reconciliation");
            return Ok(ReconcileReport::default());
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("reconciliation already in flight, skipping");
            return Ok(ReconcileReport::default());
        }
        let _guard = PassGuard(&self.in_flight);

        let local_cards = self.store.list_cards().await?;
        let remote_files = match self.remote.list_files().await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("remote listing failed, aborting reconciliation pass: {}", e);
                return Err(e.into());
            }
        };

        let mut report = ReconcileReport {
            ran: true,
            ..Default::default()
        };

        let mut remote_by_card_id: HashMap<String, &RemoteFileMeta> = remote_files
            .iter()
            .filter_map(|f| f.card_id().map(|id| (id.to_string(), f)))
            .collect();

        let now = Utc::now();
        let window = chrono::Duration::from_std(self.config.validation_window)
            .unwrap_or_else(|_| chrono::Duration::days(7));

        for card in &local_cards {
            match remote_by_card_id.remove(&card.meta.id) {
                None => {
                    // No remote counterpart. Evict only past the validation
                    // window, and only if no remote filename contains the id
                    // (guards against rename/race false positives).
                    let age = now - card.meta.modified;
                    let name_match = remote_files
                        .iter()
                        .any(|f| f.name.contains(card.meta.id.as_str()));
                    if age > window && !name_match {
                        match self.store.delete_card(&card.meta.id).await {
                            Ok(()) => {
                                report.evicted += 1;
                                tracing::info!(
                                    "evicted card {} (absent remotely for longer than the validation window)",
                                    card.meta.id
                                );
                            }
                            Err(e) => {
                                report.errors += 1;
                                tracing::error!("failed to evict card {}: {}", card.meta.id, e);
                            }
                        }
                    } else {
                        report.kept_unpushed += 1;
                    }
                }
                Some(meta) => {
                    // Remote wins when strictly newer
                    if meta.modified > card.meta.modified {
                        match fetch_remote_card(&*self.store, &*self.remote, meta).await {
                            Ok(_) => {
                                report.downloaded += 1;
                                tracing::debug!(
                                    "refreshed stale local card {} from remote",
                                    card.meta.id
                                );
                            }
                            Err(e) => {
                                report.errors += 1;
                                tracing::error!(
                                    "failed to refresh card {} from remote: {}",
                                    card.meta.id,
                                    e
                                );
                            }
                        }
                    }
                }
            }
        }

        // Remote files with no local counterpart: first-sync case
        for (card_id, meta) in remote_by_card_id {
            match fetch_remote_card(&*self.store, &*self.remote, meta).await {
                Ok(_) => {
                    report.downloaded += 1;
                    tracing::debug!("downloaded new remote card {}", card_id);
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::error!("failed to download remote card {}: {}", card_id, e);
                }
            }
        }

        if report.downloaded + report.evicted + report.errors > 0 {
            tracing::info!(
                "reconciliation done: {} downloaded, {} evicted, {} kept unpushed, {} errors",
                report.downloaded,
                report.evicted,
                report.kept_unpushed,
                report.errors
            );
        }
        Ok(report)
    }

    /// Local/remote pairs from a live listing
    async fn paired_cards(&self) -> Result<Vec<(Card, RemoteFileMeta)>, SyncError> {
        let local_cards = self.store.list_cards().await?;
        let remote_files = self.remote.list_files().await?;

        let mut remote_by_card_id: HashMap<String, RemoteFileMeta> = remote_files
            .into_iter()
            .filter_map(|f| {
                let id = f.card_id()?.to_string();
                Some((id, f))
            })
            .collect();

        Ok(local_cards
            .into_iter()
            .filter_map(|card| {
                remote_by_card_id
                    .remove(&card.meta.id)
                    .map(|meta| (card, meta))
            })
            .collect())
    }

    /// Classify every local/remote pair by timestamp.
    ///
    /// Callable independently of a reconciliation pass; uses a live remote
    /// listing.
    pub async fn detect_conflicts(&self) -> Result<Vec<CardConflict>, SyncError> {
        let pairs = self.paired_cards().await?;
        Ok(pairs
            .into_iter()
            .map(|(card, meta)| CardConflict {
                kind: self.classify(card.meta.modified, meta.modified),
                card_id: card.meta.id,
                local_modified: card.meta.modified,
                remote_modified: meta.modified,
            })
            .collect())
    }

    /// Prefer-newer resolution: copy the strictly newer side's content over
    /// the other; same-time pairs are left untouched.
    pub async fn resolve_conflicts(&self) -> Result<ResolveReport, SyncError> {
        let pairs = self.paired_cards().await?;
        let mut report = ResolveReport::default();

        for (card, meta) in pairs {
            match self.classify(card.meta.modified, meta.modified) {
                ConflictKind::SameTime => {
                    report.left_untouched += 1;
                }
                ConflictKind::LocalNewer => {
                    let content = crate::utils::markdown::serialize(&card);
                    let path = self.config.remote_path_for(&card.remote_name());
                    match self.remote.upload_at_path(&path, &content, true).await {
                        Ok(()) => report.uploaded += 1,
                        Err(e) => {
                            tracing::error!(
                                "failed to push newer local card {}: {}",
                                card.meta.id,
                                e
                            );
                        }
                    }
                }
                ConflictKind::RemoteNewer => {
                    match fetch_remote_card(&*self.store, &*self.remote, &meta).await {
                        Ok(_) => report.downloaded += 1,
                        Err(e) => {
                            tracing::error!(
                                "failed to pull newer remote card {}: {}",
                                card.meta.id,
                                e
                            );
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// Spawn a periodic reconciliation task. Overlap is impossible: the
    /// in-flight guard turns a tick that lands during a running pass into a
    /// skip. Dropping the handle shuts the task down.
    pub fn start(self: &Arc<Self>, interval: Duration) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Swallow the immediate first tick; the host decides when the
            // first pass runs (usually right after startup sync).
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        tracing::info!("reconciler shutting down");
                        break;
                    }

                    _ = ticker.tick() => {
                        if let Err(e) = manager.reconcile().await {
                            tracing::warn!("scheduled reconciliation failed: {}", e);
                        }
                    }
                }
            }
        });

        ReconcilerHandle {
            _shutdown_tx: shutdown_tx,
        }
    }
}

/// Keeps the periodic reconciliation task alive; drop to stop it
pub struct ReconcilerHandle {
    _shutdown_tx: mpsc::Sender<()>,
}
