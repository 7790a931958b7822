//! In-memory storage account used for tests and the offline demo.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BackendConnector, PageStream, StorageBackend};
use crate::credential::CredentialStrategy;
use crate::error::{BackendError, BackendErrorKind, BackendResult, ContentsResult};
use crate::models::{BlobItem, BlobProperties, ContainerItem, DownloadedBlob, Metadata};
use crate::settings::ServiceSettings;

/// A blob held by the memory backend.
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    pub name: String,
    pub content: Bytes,
    pub last_modified: DateTime<Utc>,
    pub access_tier: Option<String>,
    pub metadata: Metadata,
    pub tags: Metadata,
    /// Tag reads fail with a permission error, like a caller lacking the
    /// tag-read role.
    pub tags_denied: bool,
}

impl MemoryBlob {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            last_modified: Utc::now(),
            access_tier: None,
            metadata: Metadata::new(),
            tags: Metadata::new(),
            tags_denied: false,
        }
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn access_tier(mut self, tier: impl Into<String>) -> Self {
        self.access_tier = Some(tier.into());
        self
    }

    pub fn deny_tags(mut self) -> Self {
        self.tags_denied = true;
        self
    }

    fn to_item(&self) -> BlobItem {
        BlobItem {
            name: self.name.clone(),
            last_modified: Some(self.last_modified),
            content_length: Some(self.content.len() as u64),
            access_tier: self.access_tier.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryContainer {
    last_modified: DateTime<Utc>,
    metadata: Vec<(String, String)>,
    /// Blobs in insertion order.
    blobs: Vec<MemoryBlob>,
}

/// In-memory storage account.
///
/// Containers are listed by name, blobs in insertion order. The backend
/// records every connect and counts backend round trips so callers can
/// observe how the service used it.
pub struct MemoryBackend {
    containers: DashMap<Arc<str>, MemoryContainer>,
    metadata_on_download: AtomicBool,
    page_requests: Arc<AtomicUsize>,
    properties_requests: AtomicUsize,
    tag_requests: AtomicUsize,
    connections: Mutex<Vec<CredentialStrategy>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            containers: DashMap::new(),
            metadata_on_download: AtomicBool::new(true),
            page_requests: Arc::new(AtomicUsize::new(0)),
            properties_requests: AtomicUsize::new(0),
            tag_requests: AtomicUsize::new(0),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Creates a backend seeded with a few sample containers and blobs.
    pub fn demo() -> Self {
        let backend = Self::new();
        backend.create_container("audit", &[("containerType", "audit"), ("Department", "IT")]);
        backend.create_container("logs", &[("containerType", "logs")]);
        backend.create_container("metrics", &[("containerType", "metrics")]);
        backend.create_container("reports", &[]);

        let seeds = [
            (
                "audit",
                MemoryBlob::new("20240105-signins.json", r#"{"events": 42}"#)
                    .metadata("source", "entra")
                    .tag("classification", "confidential")
                    .access_tier("Cool"),
            ),
            (
                "audit",
                MemoryBlob::new("20240101-signins.json", r#"{"events": 17}"#)
                    .metadata("source", "entra")
                    .tag("classification", "confidential")
                    .deny_tags(),
            ),
            (
                "logs",
                MemoryBlob::new("app.log", "started\nready\n").access_tier("Hot"),
            ),
            (
                "reports",
                MemoryBlob::new("quarterly.txt", "Q1 revenue: up")
                    .metadata("Project", "Demo")
                    .tag("year", "2024"),
            ),
        ];
        for (container, blob) in seeds {
            backend
                .put_blob(container, blob)
                .expect("seed container exists");
        }
        backend
    }

    /// Creates (or replaces) a container with metadata in the given order.
    pub fn create_container(&self, name: &str, metadata: &[(&str, &str)]) {
        self.containers.insert(
            Arc::from(name),
            MemoryContainer {
                last_modified: Utc::now(),
                metadata: metadata
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                blobs: Vec::new(),
            },
        );
    }

    /// Stores a blob, replacing any blob of the same name in place.
    pub fn put_blob(&self, container: &str, blob: MemoryBlob) -> BackendResult<()> {
        let mut entry = self
            .containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        match entry.blobs.iter_mut().find(|b| b.name == blob.name) {
            Some(existing) => *existing = blob,
            None => entry.blobs.push(blob),
        }
        entry.last_modified = Utc::now();
        Ok(())
    }

    /// Controls whether downloads carry the blob metadata.
    pub fn set_metadata_on_download(&self, enabled: bool) {
        self.metadata_on_download.store(enabled, Ordering::SeqCst);
    }

    /// Returns a connector handing out this backend.
    pub fn connector(self: &Arc<Self>) -> MemoryConnector {
        MemoryConnector {
            backend: Arc::clone(self),
        }
    }

    /// Number of listing pages served so far.
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Number of properties fetches served so far.
    pub fn properties_requests(&self) -> usize {
        self.properties_requests.load(Ordering::SeqCst)
    }

    /// Number of tag fetches served so far.
    pub fn tag_requests(&self) -> usize {
        self.tag_requests.load(Ordering::SeqCst)
    }

    /// Credential strategies of every connect, oldest first.
    pub fn connections(&self) -> Vec<CredentialStrategy> {
        self.connections.lock().clone()
    }

    fn find_blob(&self, container: &str, blob: &str) -> BackendResult<MemoryBlob> {
        let entry = self
            .containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        entry
            .blobs
            .iter()
            .find(|b| b.name == blob)
            .cloned()
            .ok_or_else(|| {
                BackendError::not_found(format!(
                    "blob '{}' does not exist in container '{}'",
                    blob, container
                ))
            })
    }

    fn paged<T: Send + 'static>(&self, items: Vec<T>, page_size: NonZeroU32) -> PageStream<T> {
        let page_size = page_size.get() as usize;
        let mut pages = Vec::new();
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            pages.push(items.by_ref().take(page_size).collect::<Vec<_>>());
        }
        if pages.is_empty() {
            pages.push(Vec::new());
        }

        let counter = Arc::clone(&self.page_requests);
        stream::iter(pages)
            .map(move |page| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(page)
            })
            .boxed()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn list_containers(&self, page_size: NonZeroU32) -> PageStream<ContainerItem> {
        let mut items: Vec<ContainerItem> = self
            .containers
            .iter()
            .map(|entry| ContainerItem {
                name: entry.key().to_string(),
                last_modified: entry.last_modified,
                metadata: entry.metadata.clone(),
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        self.paged(items, page_size)
    }

    fn list_blobs(&self, container: &str, page_size: NonZeroU32) -> PageStream<BlobItem> {
        let items: Vec<BlobItem> = match self.containers.get(container) {
            Some(entry) => entry.blobs.iter().map(MemoryBlob::to_item).collect(),
            None => {
                self.page_requests.fetch_add(1, Ordering::SeqCst);
                return stream::once(futures::future::ready(Err(container_not_found(container))))
                    .boxed();
            }
        };
        self.paged(items, page_size)
    }

    async fn download(&self, container: &str, blob: &str) -> BackendResult<DownloadedBlob> {
        let blob = self.find_blob(container, blob)?;
        let metadata = self
            .metadata_on_download
            .load(Ordering::SeqCst)
            .then_some(blob.metadata);
        Ok(DownloadedBlob {
            content: blob.content,
            metadata,
        })
    }

    async fn get_properties(&self, container: &str, blob: &str) -> BackendResult<BlobProperties> {
        self.properties_requests.fetch_add(1, Ordering::SeqCst);
        let blob = self.find_blob(container, blob)?;
        Ok(BlobProperties {
            last_modified: Some(blob.last_modified),
            content_length: Some(blob.content.len() as u64),
            metadata: blob.metadata,
        })
    }

    async fn get_tags(&self, container: &str, blob: &str) -> BackendResult<Metadata> {
        self.tag_requests.fetch_add(1, Ordering::SeqCst);
        let blob = self.find_blob(container, blob)?;
        if blob.tags_denied {
            return Err(BackendError::with_message(
                BackendErrorKind::PermissionDenied,
                format!("reading tags of '{}' is not permitted", blob.name),
            ));
        }
        Ok(blob.tags)
    }
}

/// Connector returning a shared [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryConnector {
    backend: Arc<MemoryBackend>,
}

impl BackendConnector for MemoryConnector {
    fn connect(
        &self,
        _settings: &ServiceSettings,
        credential: CredentialStrategy,
    ) -> ContentsResult<Arc<dyn StorageBackend>> {
        self.backend.connections.lock().push(credential);
        let backend: Arc<dyn StorageBackend> = self.backend.clone();
        Ok(backend)
    }
}

fn container_not_found(container: &str) -> BackendError {
    BackendError::not_found(format!("container '{}' does not exist", container))
}
