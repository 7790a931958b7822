//! Storage backends the contents service reads from.

mod azure;
mod memory;

pub use azure::*;
pub use memory::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::credential::CredentialStrategy;
use crate::error::{BackendResult, ContentsResult};
use crate::models::{BlobItem, BlobProperties, ContainerItem, DownloadedBlob, Metadata};
use crate::settings::ServiceSettings;

/// Lazy stream of listing pages. Each item is one backend round trip.
pub type PageStream<T> = BoxStream<'static, BackendResult<Vec<T>>>;

/// Read operations a storage account exposes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Lists all containers with their metadata.
    fn list_containers(&self, page_size: NonZeroU32) -> PageStream<ContainerItem>;

    /// Lists all blobs of a container with their metadata.
    fn list_blobs(&self, container: &str, page_size: NonZeroU32) -> PageStream<BlobItem>;

    /// Downloads the full content of a blob.
    async fn download(&self, container: &str, blob: &str) -> BackendResult<DownloadedBlob>;

    /// Fetches the properties and metadata of a blob.
    async fn get_properties(&self, container: &str, blob: &str) -> BackendResult<BlobProperties>;

    /// Fetches the index tags of a blob.
    async fn get_tags(&self, container: &str, blob: &str) -> BackendResult<Metadata>;
}

/// Opens a backend for a single operation.
pub trait BackendConnector: Send + Sync {
    fn connect(
        &self,
        settings: &ServiceSettings,
        credential: CredentialStrategy,
    ) -> ContentsResult<Arc<dyn StorageBackend>>;
}
