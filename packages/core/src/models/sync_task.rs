//! Sync queue task types
//!
//! A `SyncTask` is a queued, retryable mutation destined for the remote
//! store. Tasks are created when a remote write fails while the local write
//! succeeded, and are drained later by the offline queue.

use crate::models::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The mutation a queued task will replay against the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

/// Lifecycle state of a queued task.
///
/// `pending -> processing -> completed | failed`; a dispatch failure reverts
/// `processing` back to `pending` with `attempts` incremented. `failed` is
/// terminal for automatic processing — only a manual retry resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncTaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SyncTaskStatus {
    /// Stable string form used for the store's status column/index
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTaskStatus::Pending => "pending",
            SyncTaskStatus::Processing => "processing",
            SyncTaskStatus::Completed => "completed",
            SyncTaskStatus::Failed => "failed",
        }
    }
}

/// A queued mutation: one create/update/delete to replay remotely.
///
/// `card` is present for create/update; `card_id` for delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub id: String,

    pub operation: SyncOperation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    pub enqueued_at: DateTime<Utc>,

    pub attempts: u32,

    pub status: SyncTaskStatus,
}

impl SyncTask {
    /// Build a create/update task carrying the full card payload
    pub fn for_card(operation: SyncOperation, card: Card) -> Self {
        debug_assert!(operation != SyncOperation::Delete);
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            card: Some(card),
            card_id: None,
            enqueued_at: Utc::now(),
            attempts: 0,
            status: SyncTaskStatus::Pending,
        }
    }

    /// Build a delete task carrying only the card id
    pub fn for_delete(card_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation: SyncOperation::Delete,
            card: None,
            card_id: Some(card_id),
            enqueued_at: Utc::now(),
            attempts: 0,
            status: SyncTaskStatus::Pending,
        }
    }

    /// The card id this task targets, regardless of operation
    pub fn target_card_id(&self) -> Option<&str> {
        self.card
            .as_ref()
            .map(|c| c.meta.id.as_str())
            .or(self.card_id.as_deref())
    }
}
