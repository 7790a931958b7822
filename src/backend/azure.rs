//! Azure Blob Storage backend.

use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_core::error::ErrorKind;
use azure_core::prelude::MaxResults;
use azure_core::StatusCode;
use azure_identity::{
    AppServiceManagedIdentityCredential, TokenCredentialOptions,
    VirtualMachineManagedIdentityCredential,
};
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::*;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use super::{BackendConnector, PageStream, StorageBackend};
use crate::credential::CredentialStrategy;
use crate::error::{BackendError, BackendErrorKind, BackendResult, ContentsError, ContentsResult};
use crate::models::{BlobItem, BlobProperties, ContainerItem, DownloadedBlob, Metadata};
use crate::retry::RetryPolicy;
use crate::settings::ServiceSettings;

/// Connects to Azure with a fresh client for every operation.
#[derive(Debug, Clone, Default)]
pub struct AzureConnector {
    retry: RetryPolicy,
}

impl AzureConnector {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    fn service_client(
        &self,
        settings: &ServiceSettings,
        credentials: StorageCredentials,
    ) -> BlobServiceClient {
        let builder = if settings.blob_endpoint.is_some() {
            ClientBuilder::with_location(
                CloudLocation::Custom {
                    account: settings.account_name.clone(),
                    uri: settings.blob_url(),
                },
                credentials,
            )
        } else {
            ClientBuilder::new(settings.account_name.clone(), credentials)
        };
        builder
            .retry(self.retry.to_retry_options())
            .blob_service_client()
    }
}

impl BackendConnector for AzureConnector {
    fn connect(
        &self,
        settings: &ServiceSettings,
        credential: CredentialStrategy,
    ) -> ContentsResult<Arc<dyn StorageBackend>> {
        debug!(
            "Connecting to {} using {} credentials",
            settings.blob_url(),
            credential.as_str()
        );

        let credentials = StorageCredentials::token_credential(token_credential(credential)?);
        let client = self.service_client(settings, credentials);

        let backend: Arc<dyn StorageBackend> = Arc::new(AzureBackend { client });
        Ok(backend)
    }
}

/// Creates the token credential for a strategy.
fn token_credential(strategy: CredentialStrategy) -> ContentsResult<Arc<dyn TokenCredential>> {
    let credential = match strategy {
        CredentialStrategy::ManagedIdentity => {
            managed_identity_credential(std::env::var(IDENTITY_ENDPOINT_ENV).is_ok())
        }
        CredentialStrategy::DefaultChain => azure_identity::create_default_credential(),
    };
    credential.map_err(|e| {
        ContentsError::Backend(BackendError::with_message(
            BackendErrorKind::Unauthenticated,
            format!("cannot create {} credential: {}", strategy.as_str(), e),
        ))
    })
}

/// Set on App Service and Functions hosts, which serve tokens locally.
const IDENTITY_ENDPOINT_ENV: &str = "IDENTITY_ENDPOINT";

/// Managed identity of the hosting App Service, or of the VM through IMDS.
fn managed_identity_credential(app_service: bool) -> azure_core::Result<Arc<dyn TokenCredential>> {
    let credential: Arc<dyn TokenCredential> = if app_service {
        Arc::new(AppServiceManagedIdentityCredential::create(
            TokenCredentialOptions::default(),
        )?)
    } else {
        Arc::new(VirtualMachineManagedIdentityCredential::new(
            TokenCredentialOptions::default(),
        ))
    };
    Ok(credential)
}

/// Backend over one Azure storage account.
#[derive(Clone)]
pub struct AzureBackend {
    client: BlobServiceClient,
}

impl AzureBackend {
    fn blob_client(&self, container: &str, blob: &str) -> BlobClient {
        self.client
            .container_client(container.to_owned())
            .blob_client(blob.to_owned())
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn list_containers(&self, page_size: NonZeroU32) -> PageStream<ContainerItem> {
        self.client
            .list_containers()
            .include_metadata(true)
            .max_results(MaxResults::new(page_size))
            .into_stream()
            .map(|page| -> BackendResult<Vec<ContainerItem>> {
                let page = page?;
                Ok(page
                    .containers
                    .into_iter()
                    .map(|container| ContainerItem {
                        last_modified: utc_from_parts(
                            container.last_modified.unix_timestamp(),
                            container.last_modified.nanosecond(),
                        )
                        .unwrap_or_default(),
                        // The SDK parses metadata into a HashMap, so the
                        // pair order follows its iteration and can differ
                        // between calls.
                        metadata: container.metadata.into_iter().collect(),
                        name: container.name,
                    })
                    .collect())
            })
            .boxed()
    }

    fn list_blobs(&self, container: &str, page_size: NonZeroU32) -> PageStream<BlobItem> {
        self.client
            .container_client(container.to_owned())
            .list_blobs()
            .include_metadata(true)
            .max_results(MaxResults::new(page_size))
            .into_stream()
            .map(|page| -> BackendResult<Vec<BlobItem>> {
                let page = page?;
                Ok(page
                    .blobs
                    .blobs()
                    .map(|blob| BlobItem {
                        name: blob.name.clone(),
                        last_modified: utc_from_parts(
                            blob.properties.last_modified.unix_timestamp(),
                            blob.properties.last_modified.nanosecond(),
                        ),
                        content_length: Some(blob.properties.content_length),
                        access_tier: blob
                            .properties
                            .access_tier
                            .map(|tier| <&'static str>::from(tier).to_string()),
                        metadata: blob.metadata.clone().unwrap_or_default(),
                    })
                    .collect())
            })
            .boxed()
    }

    async fn download(&self, container: &str, blob: &str) -> BackendResult<DownloadedBlob> {
        let mut stream = self.blob_client(container, blob).get().into_stream();
        let mut content = Vec::new();
        let mut metadata = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if metadata.is_none() {
                metadata = chunk.blob.metadata.clone();
            }
            let data = chunk.data.collect().await?;
            content.extend_from_slice(&data);
        }

        Ok(DownloadedBlob {
            content: Bytes::from(content),
            metadata,
        })
    }

    async fn get_properties(&self, container: &str, blob: &str) -> BackendResult<BlobProperties> {
        let response = self.blob_client(container, blob).get_properties().await?;
        let blob = response.blob;
        Ok(BlobProperties {
            last_modified: utc_from_parts(
                blob.properties.last_modified.unix_timestamp(),
                blob.properties.last_modified.nanosecond(),
            ),
            content_length: Some(blob.properties.content_length),
            metadata: blob.metadata.unwrap_or_default(),
        })
    }

    async fn get_tags(&self, container: &str, blob: &str) -> BackendResult<Metadata> {
        let response = self.blob_client(container, blob).get_tags().await?;
        Ok(response.tags.into())
    }
}

impl From<azure_core::Error> for BackendError {
    fn from(err: azure_core::Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::HttpResponse { status, .. } => match *status {
                StatusCode::NotFound => BackendErrorKind::NotFound,
                StatusCode::Forbidden => BackendErrorKind::PermissionDenied,
                StatusCode::Unauthorized => BackendErrorKind::Unauthenticated,
                _ => BackendErrorKind::Other,
            },
            ErrorKind::Credential => BackendErrorKind::Unauthenticated,
            ErrorKind::Io => BackendErrorKind::Transport,
            _ => BackendErrorKind::Other,
        };
        BackendError::with_message(kind, err.to_string())
    }
}

fn utc_from_parts(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RawSettings;
    use axum::http::StatusCode as HttpStatus;
    use axum::response::IntoResponse;
    use axum::Router;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    const LIST_BLOBS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="http://127.0.0.1/devstoreaccount1" ContainerName="reports">
    <Blobs>
        <Blob>
            <Name>b.csv</Name>
            <Properties>
                <Creation-Time>Thu, 01 Jul 2021 10:44:59 GMT</Creation-Time>
                <Last-Modified>Thu, 01 Jul 2021 10:44:59 GMT</Last-Modified>
                <Etag>0x8D93C7D4629C227</Etag>
                <Content-Length>8</Content-Length>
                <Content-Type>text/csv</Content-Type>
                <BlobType>BlockBlob</BlobType>
                <AccessTier>Cool</AccessTier>
            </Properties>
            <Metadata>
                <owner>ops</owner>
            </Metadata>
        </Blob>
        <Blob>
            <Name>a.txt</Name>
            <Properties>
                <Creation-Time>Thu, 01 Jul 2021 10:45:02 GMT</Creation-Time>
                <Last-Modified>Thu, 01 Jul 2021 10:45:02 GMT</Last-Modified>
                <Etag>0x228281B5D517B20</Etag>
                <Content-Length>3</Content-Length>
                <Content-Type>text/plain</Content-Type>
                <BlobType>BlockBlob</BlobType>
            </Properties>
        </Blob>
    </Blobs>
    <NextMarker />
</EnumerationResults>"#;

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(40),
            max_retries,
        }
    }

    /// Serves `app` locally and returns settings pointing at it.
    async fn serve(app: Router) -> ServiceSettings {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut raw = RawSettings::for_account("devstoreaccount1");
        raw.blob_endpoint = Some(format!("http://127.0.0.1:{}/devstoreaccount1", port));
        raw.resolve().unwrap()
    }

    fn backend(settings: &ServiceSettings, retry: RetryPolicy) -> AzureBackend {
        AzureBackend {
            client: AzureConnector::new(retry)
                .service_client(settings, StorageCredentials::anonymous()),
        }
    }

    fn service_headers() -> [(&'static str, String); 2] {
        [
            ("x-ms-request-id", Uuid::new_v4().to_string()),
            ("date", "Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
        ]
    }

    /// Router answering 503 to everything, recording when each request came in.
    fn unavailable(hits: Arc<Mutex<Vec<Instant>>>) -> Router {
        Router::new().fallback(move || {
            let hits = hits.clone();
            async move {
                hits.lock().push(Instant::now());
                (HttpStatus::SERVICE_UNAVAILABLE, service_headers(), "").into_response()
            }
        })
    }

    fn gaps(hits: &[Instant]) -> Vec<Duration> {
        hits.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn test_error_kinds() {
        let cases = [
            (StatusCode::NotFound, BackendErrorKind::NotFound),
            (StatusCode::Forbidden, BackendErrorKind::PermissionDenied),
            (StatusCode::Unauthorized, BackendErrorKind::Unauthenticated),
            (StatusCode::ServiceUnavailable, BackendErrorKind::Other),
        ];
        for (status, expected) in cases {
            let err = ErrorKind::http_response(status, None).into_error();
            assert_eq!(BackendError::from(err).kind, expected, "{:?}", status);
        }

        assert_eq!(
            BackendError::from(ErrorKind::Io.into_error()).kind,
            BackendErrorKind::Transport
        );
        assert_eq!(
            BackendError::from(ErrorKind::Credential.into_error()).kind,
            BackendErrorKind::Unauthenticated
        );
        assert_eq!(
            BackendError::from(ErrorKind::DataConversion.into_error()).kind,
            BackendErrorKind::Other
        );
    }

    #[test]
    fn test_wrapped_error_keeps_kind() {
        let err = ErrorKind::http_response(StatusCode::NotFound, Some("BlobNotFound".to_string()))
            .into_error()
            .context("get blob properties");
        assert!(BackendError::from(err).is_not_found());
    }

    #[test]
    fn test_vm_managed_identity_credential() {
        assert!(managed_identity_credential(false).is_ok());
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let app = Router::new().fallback(|| async {
            let [request_id, date] = service_headers();
            let error_code = ("x-ms-error-code", "BlobNotFound".to_string());
            (HttpStatus::NOT_FOUND, [request_id, date, error_code], "").into_response()
        });
        let settings = serve(app).await;

        let err = backend(&settings, fast_retry(3))
            .get_properties("reports", "missing.txt")
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_unavailable_service() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let settings = serve(unavailable(hits.clone())).await;

        let err = backend(&settings, fast_retry(3))
            .get_properties("reports", "a.txt")
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Other);

        let hits = hits.lock().clone();
        assert_eq!(hits.len(), 4);
        let gaps = gaps(&hits);
        assert!(gaps[0] >= Duration::from_millis(20), "{:?}", gaps);
        assert!(gaps[1] >= Duration::from_millis(40), "{:?}", gaps);
        assert!(gaps[2] >= Duration::from_millis(40), "{:?}", gaps);
    }

    #[tokio::test]
    async fn test_first_retry_waits_initial_delay() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let settings = serve(unavailable(hits.clone())).await;
        let retry = RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::default()
        };

        backend(&settings, retry)
            .get_properties("reports", "a.txt")
            .await
            .unwrap_err();

        let hits = hits.lock().clone();
        assert_eq!(hits.len(), 2);
        let gap = gaps(&hits)[0];
        assert!(gap >= Duration::from_millis(250), "{:?}", gap);
        assert!(gap < Duration::from_millis(450), "{:?}", gap);
    }

    #[tokio::test]
    async fn test_list_blobs_maps_page() {
        let app = Router::new().fallback(|| async {
            let [request_id, date] = service_headers();
            let content_type = ("content-type", "application/xml".to_string());
            (HttpStatus::OK, [request_id, date, content_type], LIST_BLOBS_XML).into_response()
        });
        let settings = serve(app).await;

        let pages: Vec<Vec<BlobItem>> = backend(&settings, fast_retry(0))
            .list_blobs("reports", settings.page_size)
            .map(|page| page.unwrap())
            .collect()
            .await;
        assert_eq!(pages.len(), 1);

        let blobs = &pages[0];
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].name, "b.csv");
        assert_eq!(blobs[0].content_length, Some(8));
        assert_eq!(blobs[0].access_tier.as_deref(), Some("Cool"));
        assert_eq!(blobs[0].metadata.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(
            blobs[0].last_modified.map(|t| t.timestamp()),
            Some(1_625_136_299)
        );
        assert_eq!(blobs[1].access_tier, None);
        assert!(blobs[1].metadata.is_empty());
    }
}
