//! Remote file descriptors
//!
//! Metadata the cloud backend reports for each stored file. One remote file
//! maps 1:1 to a Card via `name == "<card id>.md"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote-side descriptor for a single stored file.
///
/// `modified` comes from the remote clock; the reconciler compares it against
/// local card timestamps, absorbing small skew via the same-time tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileMeta {
    /// Full backend path (unique key in the local metadata cache)
    pub path: String,

    /// File name, `<card id>.md`
    pub name: String,

    /// Remote modification time (remote clock, RFC 3339 on the wire)
    pub modified: DateTime<Utc>,

    /// Size in bytes
    pub size: u64,

    /// Opaque content version tag, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Pre-resolved download reference, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_ref: Option<String>,
}

impl RemoteFileMeta {
    /// The card id this file maps to, if the name follows the `<id>.md`
    /// convention.
    pub fn card_id(&self) -> Option<&str> {
        self.name.strip_suffix(".md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> RemoteFileMeta {
        RemoteFileMeta {
            path: format!("/cards/{}", name),
            name: name.to_string(),
            modified: Utc::now(),
            size: 0,
            etag: None,
            download_ref: None,
        }
    }

    #[test]
    fn test_card_id_strips_md_suffix() {
        assert_eq!(meta("abc-123.md").card_id(), Some("abc-123"));
    }

    #[test]
    fn test_card_id_rejects_other_extensions() {
        assert_eq!(meta("notes.txt").card_id(), None);
    }
}
