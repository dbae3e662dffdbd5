//! Shared test fixtures: a temp-backed local store and an in-memory fake of
//! the remote store trait.
#![allow(dead_code)]

use async_trait::async_trait;
use cardbox_core::config::SyncConfig;
use cardbox_core::db::{DatabaseService, TursoStore};
use cardbox_core::models::{Card, RemoteFileMeta};
use cardbox_core::remote::{RemoteError, RemoteStore, UploadTarget};
use cardbox_core::utils::markdown;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Fresh file-backed store; keep the TempDir alive for the test's duration
pub async fn temp_store() -> (Arc<TursoStore>, TempDir) {
    let tmp = TempDir::new().expect("create temp dir");
    let db = DatabaseService::new(tmp.path().join("test.db"))
        .await
        .expect("open test database");
    (Arc::new(TursoStore::new(Arc::new(db))), tmp)
}

/// Engine config with a credential configured (reconciliation runs)
pub fn test_config() -> SyncConfig {
    SyncConfig {
        access_token: Some("test-token".to_string()),
        ..Default::default()
    }
}

#[derive(Clone)]
struct FakeFile {
    meta: RemoteFileMeta,
    content: String,
}

/// In-memory implementation of [`RemoteStore`] with failure injection and
/// call counters.
#[derive(Default)]
pub struct FakeRemoteStore {
    files: Mutex<HashMap<String, FakeFile>>,
    fail_uploads: AtomicBool,
    fail_listing: AtomicBool,
    fail_download_paths: Mutex<HashSet<String>>,
    pub list_calls: AtomicU64,
    pub download_calls: AtomicU64,
    pub upload_calls: AtomicU64,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_for(name: &str) -> String {
        format!("/cards/{}", name)
    }

    /// Seed a raw file with an explicit listing modification time
    pub fn insert_raw(&self, name: &str, modified: DateTime<Utc>, content: &str) {
        let path = Self::path_for(name);
        let meta = RemoteFileMeta {
            path: path.clone(),
            name: name.to_string(),
            modified,
            size: content.len() as u64,
            etag: None,
            download_ref: None,
        };
        self.files.lock().unwrap().insert(
            path,
            FakeFile {
                meta,
                content: content.to_string(),
            },
        );
    }

    /// Seed a card's serialized document under `<id>.md`; the listing time
    /// defaults to the card's own modified time
    pub fn insert_card(&self, card: &Card) {
        self.insert_card_listed(card, card.meta.modified);
    }

    pub fn insert_card_listed(&self, card: &Card, listed_modified: DateTime<Utc>) {
        self.insert_raw(&card.remote_name(), listed_modified, &markdown::serialize(card));
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make downloads of one file fail while others succeed
    pub fn fail_download_for(&self, name: &str) {
        self.fail_download_paths
            .lock()
            .unwrap()
            .insert(Self::path_for(name));
    }

    pub fn content_at(&self, name: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&Self::path_for(name))
            .map(|f| f.content.clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteStore for FakeRemoteStore {
    async fn list_files(&self) -> Result<Vec<RemoteFileMeta>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RemoteError::network("listing unreachable"));
        }
        let mut metas: Vec<_> = self
            .files
            .lock()
            .unwrap()
            .values()
            .map(|f| f.meta.clone())
            .collect();
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(metas)
    }

    async fn download_file(&self, reference: &str) -> Result<String, RemoteError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_download_paths
            .lock()
            .unwrap()
            .contains(reference)
        {
            return Err(RemoteError::network("download unreachable"));
        }
        self.files
            .lock()
            .unwrap()
            .get(reference)
            .map(|f| f.content.clone())
            .ok_or_else(|| RemoteError::http(404, format!("no file at {}", reference)))
    }

    async fn get_upload_target(
        &self,
        path: &str,
        _overwrite: bool,
    ) -> Result<UploadTarget, RemoteError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(RemoteError::network("upload unreachable"));
        }
        Ok(UploadTarget {
            href: path.to_string(),
        })
    }

    async fn upload_file(&self, target: &UploadTarget, content: &str) -> Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(RemoteError::network("upload unreachable"));
        }
        let path = target.href.clone();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        self.files.lock().unwrap().insert(
            path.clone(),
            FakeFile {
                meta: RemoteFileMeta {
                    path,
                    name,
                    modified: Utc::now(),
                    size: content.len() as u64,
                    etag: None,
                    download_ref: None,
                },
                content: content.to_string(),
            },
        );
        Ok(())
    }

    async fn upload_at_path(
        &self,
        path: &str,
        content: &str,
        overwrite: bool,
    ) -> Result<(), RemoteError> {
        let target = self.get_upload_target(path, overwrite).await?;
        self.upload_file(&target, content).await
    }
}
