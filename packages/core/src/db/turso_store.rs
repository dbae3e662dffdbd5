//! TursoStore - CardStore Implementation for Turso/libsql
//!
//! Thin implementation of the [`CardStore`] trait over [`DatabaseService`]:
//! delegates SQL to the extracted `db_*` methods, handles row ↔ model
//! conversion, and wraps every operation in the shared retry helper plus the
//! injected metrics sink.
//!
//! Cards and queued tasks are stored as JSON documents (one TEXT column),
//! so their shape can evolve without ALTER TABLE; `remote_files` rows keep
//! real columns because the reconciler filters on them.

use crate::db::card_store::CardStore;
use crate::db::error::StoreError;
use crate::db::DatabaseService;
use crate::metrics::MetricsSink;
use crate::models::{Card, RemoteFileMeta, SyncTask, SyncTaskStatus};
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::Row;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// libsql-backed implementation of [`CardStore`]
pub struct TursoStore {
    db: Arc<DatabaseService>,
    retry: RetryPolicy,
    metrics: Arc<MetricsSink>,
}

impl TursoStore {
    /// Wrap a database service with the default retry policy and a fresh
    /// metrics sink
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self::with_options(db, RetryPolicy::default(), Arc::new(MetricsSink::new()))
    }

    /// Wrap a database service with an explicit retry policy and an injected
    /// metrics sink (shared sinks let the host aggregate across components)
    pub fn with_options(
        db: Arc<DatabaseService>,
        retry: RetryPolicy,
        metrics: Arc<MetricsSink>,
    ) -> Self {
        Self { db, retry, metrics }
    }

    /// This store's operation counters
    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    /// Run one store operation: retry transient failures per policy, record
    /// the outcome in the metrics sink.
    async fn instrumented<T, F, Fut>(&self, label: &str, op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = with_retry(&self.retry, label, op).await;
        self.metrics.record(start.elapsed(), result.is_ok());
        result
    }

    /// Fixed-width RFC 3339 (millisecond precision, `Z` suffix) so the
    /// timestamp columns sort lexicographically
    fn format_timestamp(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::serialization(format!("bad timestamp '{}': {}", s, e)))
    }

    fn row_to_card(row: &Row) -> Result<Card, StoreError> {
        let document: String = row
            .get(0)
            .map_err(|e| StoreError::serialization(format!("card document column: {}", e)))?;
        serde_json::from_str(&document)
            .map_err(|e| StoreError::serialization(format!("card document: {}", e)))
    }

    fn row_to_task(row: &Row) -> Result<SyncTask, StoreError> {
        let document: String = row
            .get(0)
            .map_err(|e| StoreError::serialization(format!("task document column: {}", e)))?;
        serde_json::from_str(&document)
            .map_err(|e| StoreError::serialization(format!("task document: {}", e)))
    }

    /// Convert a `remote_files` row to the model.
    ///
    /// Expected columns (in order): path, name, modified_at, size, etag,
    /// download_ref.
    fn row_to_remote_file(row: &Row) -> Result<RemoteFileMeta, StoreError> {
        let path: String = row
            .get(0)
            .map_err(|e| StoreError::serialization(format!("remote_files.path: {}", e)))?;
        let name: String = row
            .get(1)
            .map_err(|e| StoreError::serialization(format!("remote_files.name: {}", e)))?;
        let modified_at: String = row
            .get(2)
            .map_err(|e| StoreError::serialization(format!("remote_files.modified_at: {}", e)))?;
        let size: i64 = row
            .get(3)
            .map_err(|e| StoreError::serialization(format!("remote_files.size: {}", e)))?;
        let etag: Option<String> = row
            .get(4)
            .map_err(|e| StoreError::serialization(format!("remote_files.etag: {}", e)))?;
        let download_ref: Option<String> = row
            .get(5)
            .map_err(|e| StoreError::serialization(format!("remote_files.download_ref: {}", e)))?;

        Ok(RemoteFileMeta {
            path,
            name,
            modified: Self::parse_timestamp(&modified_at)?,
            size: size.max(0) as u64,
            etag,
            download_ref,
        })
    }

    async fn collect_tasks(mut rows: libsql::Rows) -> Result<Vec<SyncTask>, StoreError> {
        let mut tasks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::from_libsql("task rows", e))?
        {
            tasks.push(Self::row_to_task(&row)?);
        }
        Ok(tasks)
    }
}

#[async_trait]
impl CardStore for TursoStore {
    async fn put_card(&self, card: Card) -> Result<(), StoreError> {
        let document = serde_json::to_string(&card)
            .map_err(|e| StoreError::serialization(format!("card document: {}", e)))?;
        let modified = Self::format_timestamp(card.meta.modified);

        self.instrumented("put_card", || async {
            self.db
                .db_put_card(&card.meta.id, &modified, &document)
                .await
        })
        .await
    }

    async fn get_card(&self, id: &str) -> Result<Option<Card>, StoreError> {
        self.instrumented("get_card", || async {
            match self.db.db_get_card(id).await? {
                Some(row) => Ok(Some(Self::row_to_card(&row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        self.instrumented("list_cards", || async {
            let mut rows = self.db.db_list_cards().await?;
            let mut cards = Vec::new();
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| StoreError::from_libsql("card rows", e))?
            {
                cards.push(Self::row_to_card(&row)?);
            }
            Ok(cards)
        })
        .await
    }

    async fn delete_card(&self, id: &str) -> Result<(), StoreError> {
        self.instrumented("delete_card", || async {
            let affected = self.db.db_delete_card(id).await?;
            if affected == 0 {
                Err(StoreError::not_found(id))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn put_remote_file(&self, meta: RemoteFileMeta) -> Result<(), StoreError> {
        let modified = Self::format_timestamp(meta.modified);

        self.instrumented("put_remote_file", || async {
            self.db
                .db_put_remote_file(
                    &meta.path,
                    &meta.name,
                    &modified,
                    meta.size as i64,
                    meta.etag.as_deref(),
                    meta.download_ref.as_deref(),
                )
                .await
        })
        .await
    }

    async fn get_remote_file_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RemoteFileMeta>, StoreError> {
        self.instrumented("get_remote_file_by_name", || async {
            match self.db.db_get_remote_file_by_name(name).await? {
                Some(row) => Ok(Some(Self::row_to_remote_file(&row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_remote_files(&self) -> Result<Vec<RemoteFileMeta>, StoreError> {
        self.instrumented("list_remote_files", || async {
            let mut rows = self.db.db_list_remote_files().await?;
            let mut files = Vec::new();
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| StoreError::from_libsql("remote file rows", e))?
            {
                files.push(Self::row_to_remote_file(&row)?);
            }
            Ok(files)
        })
        .await
    }

    async fn delete_remote_file(&self, path: &str) -> Result<(), StoreError> {
        self.instrumented("delete_remote_file", || async {
            self.db.db_delete_remote_file(path).await?;
            Ok(())
        })
        .await
    }

    async fn replace_remote_files(&self, files: Vec<RemoteFileMeta>) -> Result<(), StoreError> {
        // Clear-then-insert is retried as one unit; the clear is idempotent,
        // so a mid-batch transaction failure reruns cleanly.
        self.instrumented("replace_remote_files", || async {
            self.db.db_clear_remote_files().await?;
            for meta in &files {
                let modified = Self::format_timestamp(meta.modified);
                self.db
                    .db_put_remote_file(
                        &meta.path,
                        &meta.name,
                        &modified,
                        meta.size as i64,
                        meta.etag.as_deref(),
                        meta.download_ref.as_deref(),
                    )
                    .await?;
            }
            Ok(())
        })
        .await
    }

    async fn enqueue_task(&self, task: SyncTask) -> Result<(), StoreError> {
        let document = serde_json::to_string(&task)
            .map_err(|e| StoreError::serialization(format!("task document: {}", e)))?;
        let enqueued_at = Self::format_timestamp(task.enqueued_at);

        self.instrumented("enqueue_task", || async {
            self.db
                .db_enqueue_task(&task.id, task.status.as_str(), &enqueued_at, &document)
                .await
        })
        .await
    }

    async fn get_task(&self, id: &str) -> Result<SyncTask, StoreError> {
        self.instrumented("get_task", || async {
            match self.db.db_get_task(id).await? {
                Some(row) => Self::row_to_task(&row),
                None => Err(StoreError::not_found(id)),
            }
        })
        .await
    }

    async fn list_pending_tasks(&self) -> Result<Vec<SyncTask>, StoreError> {
        self.instrumented("list_pending_tasks", || async {
            let rows = self
                .db
                .db_list_tasks_by_status(SyncTaskStatus::Pending.as_str())
                .await?;
            Self::collect_tasks(rows).await
        })
        .await
    }

    async fn list_tasks(&self) -> Result<Vec<SyncTask>, StoreError> {
        self.instrumented("list_tasks", || async {
            let rows = self.db.db_list_tasks().await?;
            Self::collect_tasks(rows).await
        })
        .await
    }

    async fn update_task(&self, task: &SyncTask) -> Result<(), StoreError> {
        let document = serde_json::to_string(task)
            .map_err(|e| StoreError::serialization(format!("task document: {}", e)))?;

        self.instrumented("update_task", || async {
            let affected = self
                .db
                .db_update_task(&task.id, task.status.as_str(), &document)
                .await?;
            if affected == 0 {
                Err(StoreError::not_found(task.id.as_str()))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn clear_tasks(&self, status: Option<SyncTaskStatus>) -> Result<u64, StoreError> {
        self.instrumented("clear_tasks", || async {
            self.db
                .db_clear_tasks(status.map(|s| s.as_str()))
                .await
        })
        .await
    }
}
