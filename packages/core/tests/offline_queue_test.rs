//! Offline queue integration tests
//!
//! Covers the drain state machine: bounded retry into terminal `failed`,
//! exclusion of failed tasks from later passes, manual retry, the delete
//! limitation, and the reentrancy guard.

mod common;

use anyhow::Result;
use cardbox_core::db::CardStore;
use cardbox_core::models::{Card, SyncOperation, SyncTaskStatus};
use cardbox_core::services::OfflineQueue;
use cardbox_core::utils::markdown;
use common::{temp_store, test_config, FakeRemoteStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

async fn queue_fixture() -> (Arc<OfflineQueue>, Arc<dyn CardStore>, Arc<FakeRemoteStore>, TempDir) {
    let (store, tmp) = temp_store().await;
    let store: Arc<dyn CardStore> = store;
    let remote = Arc::new(FakeRemoteStore::new());
    let queue = Arc::new(OfflineQueue::new(
        store.clone(),
        remote.clone(),
        test_config(),
    ));
    (queue, store, remote, tmp)
}

fn card(title: &str) -> Card {
    let mut card = Card::new(title.to_string());
    card.description = "queued content".to_string();
    card
}

#[tokio::test]
async fn test_process_all_uploads_pending_tasks() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;

    let c = card("Queued");
    queue.enqueue_card(SyncOperation::Update, c.clone()).await?;

    let outcome = queue.process_all().await?;
    assert!(outcome.ran);
    assert_eq!(outcome.completed, 1);
    assert_eq!(outcome.failed, 0);

    // The card's serialized document landed at <id>.md
    let uploaded = remote.content_at(&c.remote_name()).expect("file uploaded");
    assert_eq!(markdown::parse(&uploaded)?.meta.id, c.meta.id);

    // Task reached its terminal state
    let tasks = store.list_tasks().await?;
    assert_eq!(tasks[0].status, SyncTaskStatus::Completed);
    assert!(store.list_pending_tasks().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_task_fails_after_three_attempts_and_is_excluded() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;
    remote.set_fail_uploads(true);

    let task = queue
        .enqueue_card(SyncOperation::Update, card("Unlucky"))
        .await?;

    // Attempts 1 and 2 requeue the task as pending
    for expected_attempts in 1..=2u32 {
        let outcome = queue.process_all().await?;
        assert_eq!(outcome.requeued, 1);
        let current = store.get_task(&task.id).await?;
        assert_eq!(current.status, SyncTaskStatus::Pending);
        assert_eq!(current.attempts, expected_attempts);
    }

    // The third failure is terminal
    let outcome = queue.process_all().await?;
    assert_eq!(outcome.failed, 1);
    let current = store.get_task(&task.id).await?;
    assert_eq!(current.status, SyncTaskStatus::Failed);
    assert_eq!(current.attempts, 3);

    // Failed tasks never dispatch again on later passes
    let uploads_before = remote.upload_calls.load(Ordering::SeqCst);
    let outcome = queue.process_all().await?;
    assert!(outcome.ran);
    assert_eq!(outcome.completed + outcome.failed + outcome.requeued, 0);
    assert_eq!(remote.upload_calls.load(Ordering::SeqCst), uploads_before);
    Ok(())
}

#[tokio::test]
async fn test_retry_failed_resets_and_drains() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;
    remote.set_fail_uploads(true);

    let task = queue
        .enqueue_card(SyncOperation::Update, card("Second chance"))
        .await?;
    for _ in 0..3 {
        queue.process_all().await?;
    }
    assert_eq!(
        store.get_task(&task.id).await?.status,
        SyncTaskStatus::Failed
    );

    // Connectivity returns; a manual retry resurrects the task
    remote.set_fail_uploads(false);
    assert_eq!(queue.retry_failed().await?, 1);
    let current = store.get_task(&task.id).await?;
    assert_eq!(current.status, SyncTaskStatus::Pending);
    assert_eq!(current.attempts, 0);

    let outcome = queue.process_all().await?;
    assert_eq!(outcome.completed, 1);
    Ok(())
}

#[tokio::test]
async fn test_task_at_retry_bound_is_failed_without_dispatch() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;

    // Simulate a task persisted at the bound by a previous session
    let mut task = queue
        .enqueue_card(SyncOperation::Update, card("Exhausted"))
        .await?;
    task.attempts = 3;
    store.update_task(&task).await?;

    let outcome = queue.process_all().await?;
    assert_eq!(outcome.failed, 1);
    assert_eq!(remote.upload_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        store.get_task(&task.id).await?.status,
        SyncTaskStatus::Failed
    );
    Ok(())
}

#[tokio::test]
async fn test_delete_task_completes_without_remote_effect() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;

    let task = queue.enqueue_delete("gone-card".to_string()).await?;
    let outcome = queue.process_all().await?;

    // The backend has no delete endpoint: the task completes with a logged
    // warning and no upload traffic
    assert_eq!(outcome.completed, 1);
    assert_eq!(remote.upload_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        store.get_task(&task.id).await?.status,
        SyncTaskStatus::Completed
    );
    Ok(())
}

#[tokio::test]
async fn test_concurrent_process_all_is_a_no_op() -> Result<()> {
    let (queue, _store, remote, _tmp) = queue_fixture().await;

    let c = card("Once only");
    queue.enqueue_card(SyncOperation::Update, c.clone()).await?;

    let (a, b) = tokio::join!(queue.process_all(), queue.process_all());
    let (a, b) = (a?, b?);

    // Exactly one pass ran; the other hit the reentrancy guard
    assert!(a.ran ^ b.ran);
    assert_eq!(a.completed + b.completed, 1);
    assert_eq!(remote.upload_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_stats_count_by_status() -> Result<()> {
    let (queue, _store, remote, _tmp) = queue_fixture().await;

    queue.enqueue_card(SyncOperation::Create, card("A")).await?;
    queue.enqueue_card(SyncOperation::Update, card("B")).await?;

    let stats = queue.stats().await?;
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.completed, 0);

    queue.process_all().await?;
    let stats = queue.stats().await?;
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completed, 2);

    remote.set_fail_uploads(true);
    queue.enqueue_card(SyncOperation::Update, card("C")).await?;
    for _ in 0..3 {
        queue.process_all().await?;
    }
    let stats = queue.stats().await?;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 2);
    Ok(())
}

#[tokio::test]
async fn test_clear_completed_keeps_other_tasks() -> Result<()> {
    let (queue, store, remote, _tmp) = queue_fixture().await;

    queue.enqueue_card(SyncOperation::Update, card("Done")).await?;
    queue.process_all().await?;

    remote.set_fail_uploads(true);
    queue.enqueue_card(SyncOperation::Update, card("Stuck")).await?;
    queue.process_all().await?;

    assert_eq!(queue.clear_completed().await?, 1);
    let remaining = store.list_tasks().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].status, SyncTaskStatus::Pending);
    Ok(())
}
