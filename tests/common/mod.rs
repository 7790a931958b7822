//! Common test utilities.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use blob_browser::backend::PageStream;
use blob_browser::error::BackendResult;
use blob_browser::models::{BlobItem, BlobProperties, ContainerItem, DownloadedBlob, Metadata};
use blob_browser::settings::ServiceSettings;
use blob_browser::{
    BackendConnector, BackendError, BrowserServer, Config, ContentsResult, ContentsService,
    CredentialStrategy, MemoryBackend, RawSettings, StaticSettingsSource, StorageBackend,
};

pub const ACCOUNT: &str = "testaccount";

/// A contents service over a memory backend with replaceable settings.
pub struct Fixture {
    pub backend: Arc<MemoryBackend>,
    pub settings: Arc<StaticSettingsSource>,
    pub service: Arc<ContentsService>,
}

impl Fixture {
    /// Creates a fixture over an empty account.
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    /// Creates a fixture over the seeded demo account.
    pub fn demo() -> Self {
        Self::with_backend(MemoryBackend::demo())
    }

    pub fn with_backend(backend: MemoryBackend) -> Self {
        let backend = Arc::new(backend);
        let settings = Arc::new(StaticSettingsSource::new(RawSettings::for_account(ACCOUNT)));
        let service = Arc::new(ContentsService::new(
            settings.clone(),
            Arc::new(backend.connector()),
        ));
        Self {
            backend,
            settings,
            service,
        }
    }

    /// Returns the router serving this fixture.
    pub fn app(&self, request_timeout: Duration) -> axum::Router {
        BrowserServer::with_service(test_config(request_timeout), self.service.clone()).app()
    }
}

pub fn test_config(request_timeout: Duration) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout,
        ..Config::default()
    }
}

/// Test server wrapper.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    /// Starts a server for the service on a random port.
    pub async fn start(service: Arc<ContentsService>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server = BrowserServer::with_service(test_config(Duration::from_secs(5)), service);

        // Start server in background
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });

        Self { base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Backend whose listings are served in pages of one item, cancelling a
/// token once a given number of pages has been handed out.
pub struct CancellingBackend {
    pub containers: Vec<ContainerItem>,
    pub blobs: Vec<BlobItem>,
    pub cancel_after: usize,
    pub token: CancellationToken,
    pub pages_served: Arc<AtomicUsize>,
}

impl CancellingBackend {
    pub fn new(cancel_after: usize, token: CancellationToken) -> Self {
        Self {
            containers: Vec::new(),
            blobs: Vec::new(),
            cancel_after,
            token,
            pages_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    fn pages<T: Clone + Send + 'static>(&self, items: &[T]) -> PageStream<T> {
        let served = self.pages_served.clone();
        let token = self.token.clone();
        let cancel_after = self.cancel_after;
        let pages: Vec<Vec<T>> = items.iter().map(|item| vec![item.clone()]).collect();
        stream::iter(pages)
            .map(move |page| {
                if served.fetch_add(1, Ordering::SeqCst) + 1 == cancel_after {
                    token.cancel();
                }
                Ok(page)
            })
            .boxed()
    }
}

#[async_trait]
impl StorageBackend for CancellingBackend {
    fn list_containers(&self, _page_size: NonZeroU32) -> PageStream<ContainerItem> {
        self.pages(&self.containers)
    }

    fn list_blobs(&self, _container: &str, _page_size: NonZeroU32) -> PageStream<BlobItem> {
        self.pages(&self.blobs)
    }

    async fn download(&self, container: &str, blob: &str) -> BackendResult<DownloadedBlob> {
        Err(BackendError::not_found(format!("{}/{}", container, blob)))
    }

    async fn get_properties(&self, container: &str, blob: &str) -> BackendResult<BlobProperties> {
        Err(BackendError::not_found(format!("{}/{}", container, blob)))
    }

    async fn get_tags(&self, container: &str, blob: &str) -> BackendResult<Metadata> {
        Err(BackendError::not_found(format!("{}/{}", container, blob)))
    }
}

/// Backend whose listings never produce a page.
pub struct StalledBackend;

#[async_trait]
impl StorageBackend for StalledBackend {
    fn list_containers(&self, _page_size: NonZeroU32) -> PageStream<ContainerItem> {
        stream::pending().boxed()
    }

    fn list_blobs(&self, _container: &str, _page_size: NonZeroU32) -> PageStream<BlobItem> {
        stream::pending().boxed()
    }

    async fn download(&self, _container: &str, _blob: &str) -> BackendResult<DownloadedBlob> {
        futures::future::pending().await
    }

    async fn get_properties(&self, _container: &str, _blob: &str) -> BackendResult<BlobProperties> {
        futures::future::pending().await
    }

    async fn get_tags(&self, _container: &str, _blob: &str) -> BackendResult<Metadata> {
        futures::future::pending().await
    }
}

/// Connector handing out one fixed backend.
pub struct FixedConnector(pub Arc<dyn StorageBackend>);

impl BackendConnector for FixedConnector {
    fn connect(
        &self,
        _settings: &ServiceSettings,
        _credential: CredentialStrategy,
    ) -> ContentsResult<Arc<dyn StorageBackend>> {
        Ok(self.0.clone())
    }
}

/// Builds a service over a fixed backend for the test account.
pub fn service_over(backend: Arc<dyn StorageBackend>) -> Arc<ContentsService> {
    Arc::new(ContentsService::new(
        Arc::new(StaticSettingsSource::new(RawSettings::for_account(ACCOUNT))),
        Arc::new(FixedConnector(backend)),
    ))
}

pub fn blob_item(name: &str) -> BlobItem {
    BlobItem {
        name: name.to_string(),
        last_modified: None,
        content_length: Some(1),
        access_tier: None,
        metadata: Metadata::new(),
    }
}
