//! Local store integration tests
//!
//! Exercises the three durable collections (cards, remote-file metadata,
//! sync queue) through the CardStore trait against a real file-backed
//! database, including durability across reopen.

mod common;

use anyhow::Result;
use cardbox_core::db::{CardStore, DatabaseService, StoreError, TursoStore};
use cardbox_core::models::{
    Card, RemoteFileMeta, SyncOperation, SyncTask, SyncTaskStatus,
};
use chrono::{Duration, Utc};
use common::temp_store;
use std::sync::Arc;
use tempfile::TempDir;

fn card(title: &str) -> Card {
    let mut card = Card::new(title.to_string());
    card.description = format!("{} description", title);
    card
}

fn remote_meta(name: &str) -> RemoteFileMeta {
    RemoteFileMeta {
        path: format!("/cards/{}", name),
        name: name.to_string(),
        modified: Utc::now(),
        size: 42,
        etag: Some("etag-1".to_string()),
        download_ref: Some(format!("https://dl.example.com/{}", name)),
    }
}

#[tokio::test]
async fn test_card_put_get_round_trip() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let original = card("Round trip");
    store.put_card(original.clone()).await?;

    let fetched = store
        .get_card(&original.meta.id)
        .await?
        .expect("card should exist");
    assert_eq!(fetched, original);
    Ok(())
}

#[tokio::test]
async fn test_get_missing_card_is_none_not_error() -> Result<()> {
    let (store, _tmp) = temp_store().await;
    assert!(store.get_card("no-such-card").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_put_card_overwrites_existing() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let mut c = card("Original");
    store.put_card(c.clone()).await?;

    c.title = "Edited".to_string();
    c.touch();
    store.put_card(c.clone()).await?;

    let fetched = store.get_card(&c.meta.id).await?.unwrap();
    assert_eq!(fetched.title, "Edited");
    assert_eq!(store.list_cards().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_list_cards_returns_independent_copies() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    store.put_card(card("One")).await?;
    store.put_card(card("Two")).await?;

    let mut listed = store.list_cards().await?;
    assert_eq!(listed.len(), 2);

    // Mutating a returned copy must not affect the store
    listed[0].title = "Mutated".to_string();
    let again = store.list_cards().await?;
    assert!(again.iter().all(|c| c.title != "Mutated"));
    Ok(())
}

#[tokio::test]
async fn test_delete_card_then_not_found() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let c = card("Doomed");
    store.put_card(c.clone()).await?;
    store.delete_card(&c.meta.id).await?;

    assert!(store.get_card(&c.meta.id).await?.is_none());

    // Deleting again is a typed NotFound, not a generic failure
    assert!(matches!(
        store.delete_card(&c.meta.id).await,
        Err(StoreError::NotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_cards_survive_reopen() -> Result<()> {
    let tmp = TempDir::new()?;
    let db_path = tmp.path().join("durable.db");

    let c = card("Durable");
    {
        let db = DatabaseService::new(db_path.clone()).await?;
        let store = TursoStore::new(Arc::new(db));
        store.put_card(c.clone()).await?;
        store
            .enqueue_task(SyncTask::for_card(SyncOperation::Update, c.clone()))
            .await?;
    }

    let db = DatabaseService::new(db_path).await?;
    let store = TursoStore::new(Arc::new(db));

    let fetched = store.get_card(&c.meta.id).await?.expect("card survives");
    assert_eq!(fetched, c);
    assert_eq!(store.list_pending_tasks().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_remote_file_metadata_round_trip() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let meta = remote_meta("abc.md");
    store.put_remote_file(meta.clone()).await?;

    let fetched = store
        .get_remote_file_by_name("abc.md")
        .await?
        .expect("metadata cached");
    assert_eq!(fetched.path, meta.path);
    assert_eq!(fetched.etag, meta.etag);
    assert_eq!(fetched.download_ref, meta.download_ref);
    assert_eq!(
        fetched.modified.timestamp_millis(),
        meta.modified.timestamp_millis()
    );
    Ok(())
}

#[tokio::test]
async fn test_replace_remote_files_swaps_listing() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    store.put_remote_file(remote_meta("old.md")).await?;
    store
        .replace_remote_files(vec![remote_meta("new-1.md"), remote_meta("new-2.md")])
        .await?;

    let listed = store.list_remote_files().await?;
    assert_eq!(listed.len(), 2);
    assert!(store.get_remote_file_by_name("old.md").await?.is_none());

    // Single-entry removal is idempotent
    store.delete_remote_file("/cards/new-1.md").await?;
    store.delete_remote_file("/cards/new-1.md").await?;
    assert_eq!(store.list_remote_files().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pending_tasks_are_fifo() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let mut first = SyncTask::for_card(SyncOperation::Create, card("First"));
    let mut second = SyncTask::for_card(SyncOperation::Update, card("Second"));
    // Explicit enqueue times: same-millisecond inserts would tie otherwise
    first.enqueued_at = Utc::now() - Duration::seconds(10);
    second.enqueued_at = Utc::now();

    // Insert out of order to prove ordering comes from enqueue time
    store.enqueue_task(second.clone()).await?;
    store.enqueue_task(first.clone()).await?;

    let pending = store.list_pending_tasks().await?;
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[1].id, second.id);
    Ok(())
}

#[tokio::test]
async fn test_update_task_persists_status_and_attempts() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let mut task = SyncTask::for_card(SyncOperation::Update, card("Task"));
    store.enqueue_task(task.clone()).await?;

    task.status = SyncTaskStatus::Failed;
    task.attempts = 3;
    store.update_task(&task).await?;

    let fetched = store.get_task(&task.id).await?;
    assert_eq!(fetched.status, SyncTaskStatus::Failed);
    assert_eq!(fetched.attempts, 3);

    // Failed tasks are excluded from the pending scan
    assert!(store.list_pending_tasks().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_get_unknown_task_is_typed_not_found() {
    let (store, _tmp) = temp_store().await;
    assert!(matches!(
        store.get_task("ghost-task").await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_clear_tasks_by_status() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    let mut done = SyncTask::for_card(SyncOperation::Update, card("Done"));
    done.status = SyncTaskStatus::Completed;
    let pending = SyncTask::for_card(SyncOperation::Update, card("Pending"));

    store.enqueue_task(done).await?;
    store.enqueue_task(pending.clone()).await?;

    let removed = store.clear_tasks(Some(SyncTaskStatus::Completed)).await?;
    assert_eq!(removed, 1);

    let remaining = store.list_tasks().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, pending.id);
    Ok(())
}

#[tokio::test]
async fn test_metrics_count_operations_and_are_resettable() -> Result<()> {
    let (store, _tmp) = temp_store().await;

    store.put_card(card("Counted")).await?;
    let _ = store.list_cards().await?;

    let snap = store.metrics().snapshot();
    assert_eq!(snap.operations, 2);
    assert_eq!(snap.errors, 0);

    // A typed failure counts as an error
    let _ = store.delete_card("missing").await;
    assert_eq!(store.metrics().snapshot().errors, 1);

    store.metrics().reset();
    assert_eq!(store.metrics().snapshot().operations, 0);
    Ok(())
}
