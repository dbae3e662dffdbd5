//! Remote Store Client
//!
//! Authenticated HTTP client for the single-file cloud backend. The backend
//! exposes four operations — list, download, get-upload-url, upload — and
//! the client wraps each in retry-with-backoff and classified errors, so the
//! orchestrator never special-cases transport failures beyond
//! "succeeded / failed".
//!
//! # Architecture
//!
//! - [`RemoteStore`] is the trait seam: the services depend on it, tests
//!   substitute an in-memory fake, and [`HttpRemoteStore`] is the production
//!   implementation
//! - Every response body is validated into a typed shape (`remote::types`)
//!   before leaving this module
//! - A successful listing opportunistically refreshes the local store's
//!   remote-file metadata cache when one is attached

use crate::config::SyncConfig;
use crate::db::CardStore;
use crate::metrics::MetricsSink;
use crate::models::RemoteFileMeta;
use crate::remote::error::RemoteError;
use crate::remote::types::{ListFilesResponse, UploadTarget, UploadTargetDto};
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Client contract for the single-file cloud backend.
///
/// The backend is interchangeable behind this trait; no wire format beyond
/// "whatever the implementation's backend requires" leaks past it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List all card files in the configured remote folder
    async fn list_files(&self) -> Result<Vec<RemoteFileMeta>, RemoteError>;

    /// Download a file's content. `reference` is either a pre-resolved
    /// download href from the listing or a backend path.
    async fn download_file(&self, reference: &str) -> Result<String, RemoteError>;

    /// Resolve an upload reference for a backend path
    async fn get_upload_target(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<UploadTarget, RemoteError>;

    /// Upload content to a previously resolved target
    async fn upload_file(&self, target: &UploadTarget, content: &str) -> Result<(), RemoteError>;

    /// Compound convenience: resolve a target for `path`, then upload
    async fn upload_at_path(
        &self,
        path: &str,
        content: &str,
        overwrite: bool,
    ) -> Result<(), RemoteError>;
}

/// reqwest-backed implementation of [`RemoteStore`]
pub struct HttpRemoteStore {
    http: reqwest::Client,
    base_url: String,
    folder: String,
    access_token: Option<String>,
    retry: RetryPolicy,
    metrics: Arc<MetricsSink>,
    /// When attached, successful listings are mirrored into this store's
    /// remote-file metadata cache
    meta_cache: Option<Arc<dyn CardStore>>,
}

impl HttpRemoteStore {
    /// Build a client from the engine configuration.
    ///
    /// All requests carry the configured timeout; a timeout is classified as
    /// a network error for retry purposes.
    pub fn new(config: &SyncConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.remote_base_url.trim_end_matches('/').to_string(),
            folder: config.remote_folder.clone(),
            access_token: config.access_token.clone(),
            retry: RetryPolicy::default(),
            metrics: Arc::new(MetricsSink::new()),
            meta_cache: None,
        })
    }

    /// Attach a local store whose remote-file metadata cache should be
    /// refreshed by successful listings
    pub fn with_meta_cache(mut self, store: Arc<dyn CardStore>) -> Self {
        self.meta_cache = Some(store);
        self
    }

    /// Override the retry policy and metrics sink
    pub fn with_options(mut self, retry: RetryPolicy, metrics: Arc<MetricsSink>) -> Self {
        self.retry = retry;
        self.metrics = metrics;
        self
    }

    /// This client's operation counters
    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    /// The configured credential, or an immediate auth error.
    ///
    /// Checked before dispatch so a missing token never enters the retry
    /// loop.
    fn token(&self) -> Result<&str, RemoteError> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RemoteError::auth("no access token configured"))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Map a non-success response to a classified error, carrying a bounded
    /// slice of the body for context
    async fn check(context: &str, response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut detail = response.text().await.unwrap_or_default();
        detail.truncate(200);
        Err(RemoteError::from_status(
            status.as_u16(),
            format!("{}: {}", context, detail),
        ))
    }

    async fn instrumented<T, F, Fut>(&self, label: &str, op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RemoteError>>,
    {
        let start = Instant::now();
        let result = with_retry(&self.retry, label, op).await;
        self.metrics.record(start.elapsed(), result.is_ok());
        result
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_files(&self) -> Result<Vec<RemoteFileMeta>, RemoteError> {
        let token = self.token()?.to_string();
        let url = self.endpoint("files");

        let files = self
            .instrumented("list_files", || async {
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&token)
                    .query(&[("path", self.folder.as_str())])
                    .send()
                    .await
                    .map_err(|e| RemoteError::from_transport("list_files", e))?;

                let body: ListFilesResponse = Self::check("list_files", response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| RemoteError::from_transport("list_files body", e))?;

                body.items
                    .into_iter()
                    .map(|entry| entry.into_meta())
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        // Opportunistic cache refresh; a store failure degrades the cache
        // but not the listing itself.
        if let Some(store) = &self.meta_cache {
            if let Err(e) = store.replace_remote_files(files.clone()).await {
                tracing::warn!("failed to refresh remote metadata cache: {}", e);
            }
        }

        Ok(files)
    }

    async fn download_file(&self, reference: &str) -> Result<String, RemoteError> {
        let token = self.token()?.to_string();
        let url = if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            self.endpoint("files/content")
        };
        let by_path = !reference.starts_with("http");

        self.instrumented("download_file", || async {
            let mut request = self.http.get(&url).bearer_auth(&token);
            if by_path {
                request = request.query(&[("path", reference)]);
            }
            let response = request
                .send()
                .await
                .map_err(|e| RemoteError::from_transport("download_file", e))?;

            Self::check("download_file", response)
                .await?
                .text()
                .await
                .map_err(|e| RemoteError::from_transport("download_file body", e))
        })
        .await
    }

    async fn get_upload_target(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<UploadTarget, RemoteError> {
        let token = self.token()?.to_string();
        let url = self.endpoint("files/upload");
        let overwrite = if overwrite { "true" } else { "false" };

        self.instrumented("get_upload_target", || async {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("path", path), ("overwrite", overwrite)])
                .send()
                .await
                .map_err(|e| RemoteError::from_transport("get_upload_target", e))?;

            let dto: UploadTargetDto = Self::check("get_upload_target", response)
                .await?
                .json()
                .await
                .map_err(|e| RemoteError::from_transport("get_upload_target body", e))?;

            dto.into_target()
        })
        .await
    }

    async fn upload_file(&self, target: &UploadTarget, content: &str) -> Result<(), RemoteError> {
        let token = self.token()?.to_string();

        self.instrumented("upload_file", || async {
            let response = self
                .http
                .put(&target.href)
                .bearer_auth(&token)
                .header(reqwest::header::CONTENT_TYPE, "text/markdown; charset=utf-8")
                .body(content.to_string())
                .send()
                .await
                .map_err(|e| RemoteError::from_transport("upload_file", e))?;

            Self::check("upload_file", response).await?;
            Ok(())
        })
        .await
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
