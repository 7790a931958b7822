//! Contents service: the read operations the web layer browses an account with.
//!
//! Every operation loads a fresh settings snapshot, selects the credential
//! strategy from it and opens a backend through the connector. Nothing is
//! cached between calls, so settings edits apply to the next request.

use chrono::NaiveDate;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::{BackendConnector, StorageBackend};
use crate::credential::CredentialStrategy;
use crate::error::{ContentsError, ContentsResult};
use crate::models::{BlobContent, BlobInfo, ContainerInfo, Metadata};
use crate::settings::{ServiceSettings, SettingsSource};

/// Read access to the containers and blobs of one storage account.
pub struct ContentsService {
    settings: Arc<dyn SettingsSource>,
    connector: Arc<dyn BackendConnector>,
}

impl ContentsService {
    pub fn new(settings: Arc<dyn SettingsSource>, connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Returns the settings source operations load from.
    pub fn settings(&self) -> &Arc<dyn SettingsSource> {
        &self.settings
    }

    /// Lists the containers admitted by the configured container-type filter,
    /// in backend order.
    pub async fn list_containers(
        &self,
        cancel: &CancellationToken,
    ) -> ContentsResult<Vec<ContainerInfo>> {
        let (settings, backend) = self.open()?;
        let mut pages = backend.list_containers(settings.page_size);
        let mut result = Vec::new();

        while let Some(page) = until_cancelled(cancel, pages.next()).await? {
            for container in page? {
                if settings.container_types.admits(&container) {
                    result.push(ContainerInfo::from(container));
                }
            }
        }

        debug!(
            "Listed {} containers of account {}",
            result.len(),
            settings.account_name
        );
        Ok(result)
    }

    /// Lists every blob of a container, sorted by name.
    ///
    /// `date_hint` is reserved for prefix filtering and currently does not
    /// restrict the listing.
    pub async fn list_blobs(
        &self,
        container: &str,
        date_hint: Option<NaiveDate>,
        cancel: &CancellationToken,
    ) -> ContentsResult<Vec<BlobInfo>> {
        let (settings, backend) = self.open()?;
        if let Some(date) = date_hint {
            debug!("Ignoring date hint {} for container {}", date, container);
        }

        let mut pages = backend.list_blobs(container, settings.page_size);
        let mut result = Vec::new();

        while let Some(page) = until_cancelled(cancel, pages.next()).await? {
            result.extend(page?.into_iter().map(BlobInfo::from));
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} blobs of container {}", result.len(), container);
        Ok(result)
    }

    /// Downloads a blob with its metadata and index tags.
    ///
    /// Metadata comes from the download response and falls back to a
    /// properties fetch. A failed tag fetch yields empty tags.
    pub async fn get_blob(
        &self,
        container: &str,
        blob: &str,
        cancel: &CancellationToken,
    ) -> ContentsResult<BlobContent> {
        let (_, backend) = self.open()?;

        let downloaded = until_cancelled(cancel, backend.download(container, blob)).await??;
        let content = String::from_utf8_lossy(&downloaded.content).into_owned();

        let metadata = match downloaded.metadata {
            Some(metadata) => metadata,
            None => {
                until_cancelled(cancel, backend.get_properties(container, blob))
                    .await??
                    .metadata
            }
        };

        let tags = fetch_tags(backend.as_ref(), container, blob, cancel).await?;

        Ok(BlobContent {
            name: blob.to_string(),
            content,
            metadata,
            tags,
        })
    }

    fn open(&self) -> ContentsResult<(ServiceSettings, Arc<dyn StorageBackend>)> {
        let settings = self.settings.load()?;
        let credential = CredentialStrategy::select(&settings);
        let backend = self.connector.connect(&settings, credential)?;
        Ok((settings, backend))
    }
}

/// Fetches index tags, downgrading a backend failure to empty tags.
///
/// Cancellation is still reported to the caller.
async fn fetch_tags(
    backend: &dyn StorageBackend,
    container: &str,
    blob: &str,
    cancel: &CancellationToken,
) -> ContentsResult<Metadata> {
    debug!("Fetching index tags of {}/{}", container, blob);
    match until_cancelled(cancel, backend.get_tags(container, blob)).await? {
        Ok(tags) => Ok(tags),
        Err(err) => {
            debug!(
                "Index tags of {}/{} unavailable, continuing without them: {}",
                container, blob, err
            );
            Ok(Metadata::new())
        }
    }
}

/// Awaits `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> ContentsResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ContentsError::Cancelled),
        output = fut => Ok(output),
    }
}
