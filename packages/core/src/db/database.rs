//! Database Connection Management
//!
//! Core connection and schema handling for the local store, using
//! libsql/Turso.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid PathBuf chosen by the host app
//! - **Three collections**: `cards` (keyed by id), `remote_files` (keyed by
//!   path, the cached cloud listing), `sync_queue` (keyed by task id,
//!   secondary index on status) — all durable across process restarts
//! - **Document columns**: cards and queued tasks are persisted as JSON
//!   documents; `remote_files` keeps real columns because the reconciler
//!   filters on them
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//!
//! # Connection pattern
//!
//! Always use `connect_with_timeout()` in async functions. The 5-second busy
//! timeout makes concurrent operations wait and retry instead of failing
//! immediately with `SQLITE_BUSY`; this serialization is also what enforces
//! the single-writer-per-key guarantee — no extra engine-level lock exists.

use crate::db::error::StoreError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use cardbox_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/cardbox.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the parent directory cannot be
    /// created, `StoreError::ConnectionFailed` if the database cannot be
    /// opened, or a transaction error if schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::unavailable(format!(
                        "cannot create parent directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                path: db_path.clone(),
                source: e,
            })?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// In-memory database for tests and ephemeral sessions
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        let path = PathBuf::from(":memory:");
        let db = Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                path: path.clone(),
                source: e,
            })?;

        let service = Self {
            db: Arc::new(db),
            db_path: path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Connect with the 5s busy timeout applied — the default for all async
    /// code paths.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::from_libsql("connect", e))?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    /// Execute a PRAGMA statement.
    ///
    /// PRAGMA statements return rows, so query() must be used instead of
    /// execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), StoreError> {
        let mut stmt = conn
            .prepare(pragma)
            .await
            .map_err(|e| StoreError::from_libsql(pragma, e))?;
        let _ = stmt
            .query(())
            .await
            .map_err(|e| StoreError::from_libsql(pragma, e))?;
        Ok(())
    }

    /// Create tables and indexes (idempotent, CREATE TABLE IF NOT EXISTS)
    async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                modified_at TEXT NOT NULL,
                document JSON NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create cards table", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS remote_files (
                path TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                modified_at TEXT NOT NULL,
                size INTEGER NOT NULL,
                etag TEXT,
                download_ref TEXT
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create remote_files table", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_queue (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                enqueued_at TEXT NOT NULL,
                task JSON NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create sync_queue table", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cards_modified ON cards(modified_at)",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create index 'idx_cards_modified'", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_remote_files_name ON remote_files(name)",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create index 'idx_remote_files_name'", e))?;

        // Secondary index on status: pending-task scans are the queue's hot path
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status)",
            (),
        )
        .await
        .map_err(|e| StoreError::from_libsql("create index 'idx_sync_queue_status'", e))?;

        Ok(())
    }

    //
    // CARD OPERATIONS
    //

    pub async fn db_put_card(
        &self,
        id: &str,
        modified_at: &str,
        document: &str,
    ) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO cards (id, modified_at, document) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET modified_at = excluded.modified_at,
                                           document = excluded.document",
            (id, modified_at, document),
        )
        .await
        .map_err(|e| StoreError::from_libsql("put_card", e))?;
        Ok(())
    }

    pub async fn db_get_card(&self, id: &str) -> Result<Option<libsql::Row>, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT document FROM cards WHERE id = ?")
            .await
            .map_err(|e| StoreError::from_libsql("prepare get_card", e))?;
        let mut rows = stmt
            .query([id])
            .await
            .map_err(|e| StoreError::from_libsql("get_card", e))?;
        rows.next()
            .await
            .map_err(|e| StoreError::from_libsql("get_card row", e))
    }

    pub async fn db_list_cards(&self) -> Result<libsql::Rows, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT document FROM cards ORDER BY modified_at DESC")
            .await
            .map_err(|e| StoreError::from_libsql("prepare list_cards", e))?;
        stmt.query(())
            .await
            .map_err(|e| StoreError::from_libsql("list_cards", e))
    }

    pub async fn db_delete_card(&self, id: &str) -> Result<u64, StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("DELETE FROM cards WHERE id = ?", [id])
            .await
            .map_err(|e| StoreError::from_libsql("delete_card", e))
    }

    //
    // REMOTE FILE METADATA OPERATIONS
    //

    pub async fn db_put_remote_file(
        &self,
        path: &str,
        name: &str,
        modified_at: &str,
        size: i64,
        etag: Option<&str>,
        download_ref: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO remote_files (path, name, modified_at, size, etag, download_ref)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET name = excluded.name,
                                             modified_at = excluded.modified_at,
                                             size = excluded.size,
                                             etag = excluded.etag,
                                             download_ref = excluded.download_ref",
            (path, name, modified_at, size, etag, download_ref),
        )
        .await
        .map_err(|e| StoreError::from_libsql("put_remote_file", e))?;
        Ok(())
    }

    pub async fn db_get_remote_file_by_name(
        &self,
        name: &str,
    ) -> Result<Option<libsql::Row>, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare(
                "SELECT path, name, modified_at, size, etag, download_ref
                 FROM remote_files WHERE name = ?",
            )
            .await
            .map_err(|e| StoreError::from_libsql("prepare get_remote_file_by_name", e))?;
        let mut rows = stmt
            .query([name])
            .await
            .map_err(|e| StoreError::from_libsql("get_remote_file_by_name", e))?;
        rows.next()
            .await
            .map_err(|e| StoreError::from_libsql("get_remote_file_by_name row", e))
    }

    pub async fn db_list_remote_files(&self) -> Result<libsql::Rows, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare(
                "SELECT path, name, modified_at, size, etag, download_ref
                 FROM remote_files ORDER BY name",
            )
            .await
            .map_err(|e| StoreError::from_libsql("prepare list_remote_files", e))?;
        stmt.query(())
            .await
            .map_err(|e| StoreError::from_libsql("list_remote_files", e))
    }

    pub async fn db_delete_remote_file(&self, path: &str) -> Result<u64, StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("DELETE FROM remote_files WHERE path = ?", [path])
            .await
            .map_err(|e| StoreError::from_libsql("delete_remote_file", e))
    }

    pub async fn db_clear_remote_files(&self) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("DELETE FROM remote_files", ())
            .await
            .map_err(|e| StoreError::from_libsql("clear_remote_files", e))?;
        Ok(())
    }

    //
    // SYNC QUEUE OPERATIONS
    //

    pub async fn db_enqueue_task(
        &self,
        id: &str,
        status: &str,
        enqueued_at: &str,
        task: &str,
    ) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO sync_queue (id, status, enqueued_at, task) VALUES (?, ?, ?, ?)",
            (id, status, enqueued_at, task),
        )
        .await
        .map_err(|e| StoreError::from_libsql("enqueue_task", e))?;
        Ok(())
    }

    pub async fn db_get_task(&self, id: &str) -> Result<Option<libsql::Row>, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT task FROM sync_queue WHERE id = ?")
            .await
            .map_err(|e| StoreError::from_libsql("prepare get_task", e))?;
        let mut rows = stmt
            .query([id])
            .await
            .map_err(|e| StoreError::from_libsql("get_task", e))?;
        rows.next()
            .await
            .map_err(|e| StoreError::from_libsql("get_task row", e))
    }

    /// FIFO listing of tasks in one status (ordered by enqueue time)
    pub async fn db_list_tasks_by_status(
        &self,
        status: &str,
    ) -> Result<libsql::Rows, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT task FROM sync_queue WHERE status = ? ORDER BY enqueued_at")
            .await
            .map_err(|e| StoreError::from_libsql("prepare list_tasks_by_status", e))?;
        stmt.query([status])
            .await
            .map_err(|e| StoreError::from_libsql("list_tasks_by_status", e))
    }

    pub async fn db_list_tasks(&self) -> Result<libsql::Rows, StoreError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT task FROM sync_queue ORDER BY enqueued_at")
            .await
            .map_err(|e| StoreError::from_libsql("prepare list_tasks", e))?;
        stmt.query(())
            .await
            .map_err(|e| StoreError::from_libsql("list_tasks", e))
    }

    /// Rewrite a task document and its indexed status column together so the
    /// two can never disagree.
    pub async fn db_update_task(
        &self,
        id: &str,
        status: &str,
        task: &str,
    ) -> Result<u64, StoreError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "UPDATE sync_queue SET status = ?, task = ? WHERE id = ?",
            (status, task, id),
        )
        .await
        .map_err(|e| StoreError::from_libsql("update_task", e))
    }

    pub async fn db_clear_tasks(&self, status: Option<&str>) -> Result<u64, StoreError> {
        let conn = self.connect_with_timeout().await?;
        match status {
            Some(status) => conn
                .execute("DELETE FROM sync_queue WHERE status = ?", [status])
                .await
                .map_err(|e| StoreError::from_libsql("clear_tasks", e)),
            None => conn
                .execute("DELETE FROM sync_queue", ())
                .await
                .map_err(|e| StoreError::from_libsql("clear_tasks", e)),
        }
    }
}
