//! Blob data models.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// A blob as enumerated by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_length: Option<u64>,
    pub access_tier: Option<String>,
    pub metadata: Metadata,
}

/// Blob summary shown by the blob list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub name: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes, unset when the backend omits it.
    pub size: Option<u64>,
    /// Access tier (Hot, Cool, Archive...), unset when not reported.
    pub tier: Option<String>,
    pub metadata: Metadata,
}

impl From<BlobItem> for BlobInfo {
    fn from(item: BlobItem) -> Self {
        Self {
            name: item.name,
            last_modified: item.last_modified,
            size: item.content_length,
            tier: item.access_tier,
            metadata: item.metadata,
        }
    }
}

/// Result of a blob download.
#[derive(Debug, Clone)]
pub struct DownloadedBlob {
    pub content: Bytes,
    /// Metadata attached to the download response, if the backend sent any.
    pub metadata: Option<Metadata>,
}

/// Properties of a single blob.
#[derive(Debug, Clone, Default)]
pub struct BlobProperties {
    pub last_modified: Option<DateTime<Utc>>,
    pub content_length: Option<u64>,
    pub metadata: Metadata,
}

/// Content and attributes of one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobContent {
    pub name: String,
    /// Content decoded as UTF-8 text.
    pub content: String,
    pub metadata: Metadata,
    /// Index tags, kept apart from the free-form metadata.
    pub tags: Metadata,
}
