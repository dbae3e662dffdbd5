//! Offline Queue
//!
//! Durable FIFO of pending remote mutations. When a card is saved locally
//! but the remote upload fails, the orchestrator enqueues a task here; the
//! queue drains them through the remote client once connectivity returns.
//!
//! # Processing model
//!
//! - One `process_all` pass runs tasks strictly sequentially (awaited one at
//!   a time) — cross-task parallelism is avoided to bound the remote request
//!   rate
//! - An `AtomicBool` reentrancy guard makes a second concurrent pass a
//!   logged no-op instead of a duplicate upload source
//! - A task that keeps failing transitions to `failed` after `max_retries`
//!   attempts and is excluded from automatic passes until manually retried
//!
//! # Triggers
//!
//! [`OfflineQueueWorker`] runs the queue in the background: it drains on a
//! fixed interval while running, and a cloneable [`QueueWaker`] lets other
//! components (a connectivity listener, a manual "sync now" action) wake it
//! immediately. Wake signals are coalesced.

use crate::config::SyncConfig;
use crate::db::CardStore;
use crate::models::{Card, SyncOperation, SyncTask, SyncTaskStatus};
use crate::remote::RemoteStore;
use crate::services::error::SyncError;
use crate::utils::markdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Queue contents broken down by task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Result of one `process_all` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// False when the pass was skipped because another was in flight
    pub ran: bool,
    pub completed: u64,
    pub failed: u64,
    /// Tasks that failed this pass but stay pending for a later one
    pub requeued: u64,
}

/// Durable queue of remote mutations with bounded retry
pub struct OfflineQueue {
    store: Arc<dyn CardStore>,
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
    in_flight: AtomicBool,
}

/// Resets the in-flight flag when a pass exits, error paths included
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn CardStore>, remote: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            store,
            remote,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Queue a create/update carrying the full card payload
    pub async fn enqueue_card(
        &self,
        operation: SyncOperation,
        card: Card,
    ) -> Result<SyncTask, SyncError> {
        if operation == SyncOperation::Delete {
            return Err(SyncError::queue(
                "delete tasks carry a card id, use enqueue_delete",
            ));
        }
        let task = SyncTask::for_card(operation, card);
        self.store.enqueue_task(task.clone()).await?;
        tracing::debug!(
            "queued {:?} task {} for card {}",
            task.operation,
            task.id,
            task.target_card_id().unwrap_or("?")
        );
        Ok(task)
    }

    /// Queue a delete for a card id
    pub async fn enqueue_delete(&self, card_id: String) -> Result<SyncTask, SyncError> {
        let task = SyncTask::for_delete(card_id);
        self.store.enqueue_task(task.clone()).await?;
        tracing::debug!("queued delete task {}", task.id);
        Ok(task)
    }

    /// Drain all pending tasks through the remote client.
    ///
    /// Reentrant-guarded: if a pass is already in flight this is a logged
    /// no-op (`outcome.ran == false`), preventing duplicate concurrent
    /// uploads of the same task.
    pub async fn process_all(&self) -> Result<ProcessOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("queue pass already in flight, skipping");
            return Ok(ProcessOutcome::default());
        }
        let _guard = PassGuard(&self.in_flight);

        let pending = self.store.list_pending_tasks().await?;
        let mut outcome = ProcessOutcome {
            ran: true,
            ..Default::default()
        };

        for mut task in pending {
            task.status = SyncTaskStatus::Processing;
            self.store.update_task(&task).await?;

            // Terminal guard: tasks persisted at the retry bound by an older
            // session must not be dispatched again.
            if task.attempts >= self.config.max_task_retries {
                task.status = SyncTaskStatus::Failed;
                self.store.update_task(&task).await?;
                outcome.failed += 1;
                tracing::warn!(
                    "task {} exhausted {} attempts, marking failed",
                    task.id,
                    task.attempts
                );
                continue;
            }

            match self.dispatch(&task).await {
                Ok(()) => {
                    task.status = SyncTaskStatus::Completed;
                    self.store.update_task(&task).await?;
                    outcome.completed += 1;
                }
                Err(e) => {
                    task.attempts += 1;
                    if task.attempts >= self.config.max_task_retries {
                        task.status = SyncTaskStatus::Failed;
                        outcome.failed += 1;
                        tracing::warn!(
                            "task {} failed attempt {}/{}, marking failed: {}",
                            task.id,
                            task.attempts,
                            self.config.max_task_retries,
                            e
                        );
                    } else {
                        task.status = SyncTaskStatus::Pending;
                        outcome.requeued += 1;
                        tracing::debug!(
                            "task {} failed attempt {}/{}, will retry: {}",
                            task.id,
                            task.attempts,
                            self.config.max_task_retries,
                            e
                        );
                    }
                    self.store.update_task(&task).await?;
                }
            }
        }

        if outcome.completed + outcome.failed + outcome.requeued > 0 {
            tracing::info!(
                "queue pass done: {} completed, {} failed, {} requeued",
                outcome.completed,
                outcome.failed,
                outcome.requeued
            );
        }
        Ok(outcome)
    }

    /// Replay one task against the remote store
    async fn dispatch(&self, task: &SyncTask) -> Result<(), SyncError> {
        match task.operation {
            SyncOperation::Create | SyncOperation::Update => {
                let card = task
                    .card
                    .as_ref()
                    .ok_or_else(|| SyncError::queue("create/update task missing card payload"))?;
                let content = markdown::serialize(card);
                let path = self.config.remote_path_for(&card.remote_name());
                self.remote.upload_at_path(&path, &content, true).await?;
                Ok(())
            }
            SyncOperation::Delete => {
                // The backend exposes no delete endpoint. The local row is
                // already gone; completing here records the limitation
                // instead of wedging the queue on an impossible task.
                tracing::warn!(
                    "remote backend does not support delete; task {} for card {} completed without remote effect",
                    task.id,
                    task.card_id.as_deref().unwrap_or("?")
                );
                Ok(())
            }
        }
    }

    /// Counts by status, for the UI's sync indicator
    pub async fn stats(&self) -> Result<QueueStats, SyncError> {
        let mut stats = QueueStats::default();
        for task in self.store.list_tasks().await? {
            match task.status {
                SyncTaskStatus::Pending => stats.pending += 1,
                SyncTaskStatus::Processing => stats.processing += 1,
                SyncTaskStatus::Completed => stats.completed += 1,
                SyncTaskStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    /// Manual retry: reset every failed task to pending with a fresh attempt
    /// budget. Returns the number of tasks reset.
    pub async fn retry_failed(&self) -> Result<u64, SyncError> {
        let mut reset = 0;
        for mut task in self.store.list_tasks().await? {
            if task.status == SyncTaskStatus::Failed {
                task.status = SyncTaskStatus::Pending;
                task.attempts = 0;
                self.store.update_task(&task).await?;
                reset += 1;
            }
        }
        if reset > 0 {
            tracing::info!("reset {} failed tasks for manual retry", reset);
        }
        Ok(reset)
    }

    /// Drop completed tasks from the queue
    pub async fn clear_completed(&self) -> Result<u64, SyncError> {
        Ok(self
            .store
            .clear_tasks(Some(SyncTaskStatus::Completed))
            .await?)
    }
}

/// Handle to wake the queue worker.
///
/// Lightweight and cloneable; hand it to whatever notices connectivity
/// changes. Multiple wakes coalesce into a single pass.
#[derive(Clone)]
pub struct QueueWaker {
    trigger_tx: mpsc::Sender<()>,
}

impl QueueWaker {
    /// Wake the worker to drain the queue. Non-blocking; if the worker
    /// already has a pending wake this is a no-op.
    pub fn wake(&self) {
        match self.trigger_tx.try_send(()) {
            Ok(_) => {
                tracing::debug!("queue worker wake signal sent");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("queue worker already has pending wake");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("queue worker has shut down, wake ignored");
            }
        }
    }
}

/// Background task that drains the offline queue.
///
/// Event-driven with a safety-net interval: sleeps until woken (connectivity
/// restored, manual sync) and additionally drains on `queue_interval` while
/// running. Dropping the worker shuts the task down.
pub struct OfflineQueueWorker {
    waker: QueueWaker,
    _shutdown_tx: mpsc::Sender<()>,
}

impl OfflineQueueWorker {
    /// Spawn the background drain loop
    pub fn start(queue: Arc<OfflineQueue>, interval: Duration) -> Self {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(4);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased; // Check shutdown first

                    _ = shutdown_rx.recv() => {
                        tracing::info!("queue worker shutting down");
                        break;
                    }

                    Some(_) = trigger_rx.recv() => {
                        // Coalesce rapid triggers into one pass
                        while trigger_rx.try_recv().is_ok() {}
                        if let Err(e) = queue.process_all().await {
                            tracing::error!("queue pass failed: {}", e);
                        }
                    }

                    _ = ticker.tick() => {
                        // The first tick fires immediately, which doubles as
                        // a catch-up drain of tasks left from a prior session
                        if let Err(e) = queue.process_all().await {
                            tracing::error!("scheduled queue pass failed: {}", e);
                        }
                    }
                }
            }
        });

        Self {
            waker: QueueWaker { trigger_tx },
            _shutdown_tx: shutdown_tx,
        }
    }

    /// Get a cloneable waker handle
    pub fn waker(&self) -> QueueWaker {
        self.waker.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_waker_wake_sends_signal() {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(4);
        let waker = QueueWaker { trigger_tx };

        waker.wake();
        assert!(trigger_rx.try_recv().is_ok(), "wake should have signaled");
    }

    #[test]
    fn test_waker_coalesces_when_channel_full() {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(2);
        let waker = QueueWaker { trigger_tx };

        waker.wake();
        waker.wake();
        waker.wake();

        let mut count = 0;
        while trigger_rx.try_recv().is_ok() {
            count += 1;
        }
        assert!(count <= 2, "excess wakes should coalesce, got {}", count);
    }

    #[test]
    fn test_waker_survives_closed_channel() {
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(4);
        let waker = QueueWaker { trigger_tx };
        drop(trigger_rx);

        waker.wake(); // Must not panic
    }
}
