//! Data Models
//!
//! Core data structures synchronized by the engine:
//!
//! - [`Card`] - the note-card document (title, description, sections)
//! - [`RemoteFileMeta`] - remote-side file descriptor, cached locally
//! - [`SyncTask`] - a queued, retryable mutation destined for the remote

mod card;
mod remote_file;
mod sync_task;

pub use card::{Card, CardMeta, Section, SectionItem, SectionKind, ValidationError};
pub use remote_file::RemoteFileMeta;
pub use sync_task::{SyncOperation, SyncTask, SyncTaskStatus};
