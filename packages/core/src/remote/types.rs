//! Remote API wire types
//!
//! Response shapes for the cloud backend, validated at the client boundary
//! before anything enters the core. Each endpoint has its own typed DTO —
//! there is no dynamically-typed payload anywhere past this module.

use crate::models::RemoteFileMeta;
use crate::remote::error::RemoteError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One file entry as the listing endpoint reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntryDto {
    pub path: Option<String>,
    pub name: Option<String>,
    pub modified: Option<String>,
    pub size: Option<u64>,
    pub etag: Option<String>,
    pub download_ref: Option<String>,
}

impl FileEntryDto {
    /// Validate into the core model. Fields the engine depends on (path,
    /// name, parseable modified time) are required; the rest default.
    pub fn into_meta(self) -> Result<RemoteFileMeta, RemoteError> {
        let path = self
            .path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RemoteError::invalid_response("file entry missing path"))?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RemoteError::invalid_response("file entry missing name"))?;
        let modified_raw = self
            .modified
            .ok_or_else(|| RemoteError::invalid_response("file entry missing modified time"))?;
        let modified: DateTime<Utc> = DateTime::parse_from_rfc3339(&modified_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                RemoteError::invalid_response(format!(
                    "file entry has bad modified time '{}': {}",
                    modified_raw, e
                ))
            })?;

        Ok(RemoteFileMeta {
            path,
            name,
            modified,
            size: self.size.unwrap_or(0),
            etag: self.etag,
            download_ref: self.download_ref,
        })
    }
}

/// Listing endpoint response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    #[serde(default)]
    pub items: Vec<FileEntryDto>,
}

/// Upload-target endpoint response (raw)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTargetDto {
    pub href: Option<String>,
}

/// A validated, ready-to-use upload reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub href: String,
}

impl UploadTargetDto {
    pub fn into_target(self) -> Result<UploadTarget, RemoteError> {
        let href = self
            .href
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RemoteError::invalid_response("upload target missing href"))?;
        Ok(UploadTarget { href })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_entry_converts() {
        let dto: FileEntryDto = serde_json::from_str(
            r#"{
                "path": "/cards/abc.md",
                "name": "abc.md",
                "modified": "2026-01-15T10:30:00Z",
                "size": 512,
                "etag": "v2",
                "downloadRef": "https://dl.example.com/abc"
            }"#,
        )
        .unwrap();

        let meta = dto.into_meta().unwrap();
        assert_eq!(meta.name, "abc.md");
        assert_eq!(meta.size, 512);
        assert_eq!(meta.download_ref.as_deref(), Some("https://dl.example.com/abc"));
    }

    #[test]
    fn test_missing_path_is_invalid_response() {
        let dto: FileEntryDto = serde_json::from_str(
            r#"{"name": "abc.md", "modified": "2026-01-15T10:30:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            dto.into_meta(),
            Err(RemoteError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_unparseable_modified_is_invalid_response() {
        let dto: FileEntryDto = serde_json::from_str(
            r#"{"path": "/cards/abc.md", "name": "abc.md", "modified": "yesterday"}"#,
        )
        .unwrap();
        assert!(matches!(
            dto.into_meta(),
            Err(RemoteError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_upload_target_requires_href() {
        let dto: UploadTargetDto = serde_json::from_str(r#"{"href": ""}"#).unwrap();
        assert!(dto.into_target().is_err());

        let dto: UploadTargetDto =
            serde_json::from_str(r#"{"href": "https://up.example.com/x"}"#).unwrap();
        assert_eq!(dto.into_target().unwrap().href, "https://up.example.com/x");
    }
}
