//! Runtime engine configuration
//!
//! `SyncConfig` is the single source of truth for the running engine's
//! tunables. It is built at startup by the host application and handed to
//! each component; it is NOT serialized or hot-reloaded.

use std::time::Duration;

/// Runtime configuration for the sync engine — built once at startup,
/// immutable for the engine lifetime.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the cloud backend API
    pub remote_base_url: String,

    /// Access credential for the cloud backend. `None` means offline-only:
    /// remote calls fail fast with an auth error and reconciliation passes
    /// are skipped.
    pub access_token: Option<String>,

    /// Remote folder holding card files
    pub remote_folder: String,

    /// Timeout applied to every remote HTTP request
    pub request_timeout: Duration,

    /// Attempts per queued task before it is marked failed
    pub max_task_retries: u32,

    /// Interval between background queue drains while the worker runs
    pub queue_interval: Duration,

    /// Minimum local card age before it may be evicted for lacking a remote
    /// counterpart
    pub validation_window: Duration,

    /// Timestamp difference treated as "same time" during conflict
    /// classification, absorbing clock-skew noise between the local and
    /// remote clocks
    pub same_time_tolerance: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_base_url: "https://api.cardbox.app/v1".to_string(),
            access_token: None,
            remote_folder: "/cards".to_string(),
            request_timeout: Duration::from_secs(10),
            max_task_retries: 3,
            queue_interval: Duration::from_secs(30),
            validation_window: Duration::from_secs(7 * 24 * 60 * 60),
            same_time_tolerance: Duration::from_millis(1000),
        }
    }
}

impl SyncConfig {
    /// Whether a remote credential is configured
    pub fn has_credentials(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Backend path for a card file name within the configured folder
    pub fn remote_path_for(&self, name: &str) -> String {
        format!("{}/{}", self.remote_folder.trim_end_matches('/'), name)
    }
}
