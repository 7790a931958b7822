//! Blob browser: read-only web browsing of an Azure Blob Storage account.
//!
//! The [`ContentsService`] lists containers, lists blobs and fetches blob
//! content with metadata and index tags. Settings are re-read on every
//! operation. The HTTP layer renders the results as HTML pages.
//!
//! # Example
//!
//! ```no_run
//! use blob_browser::{BrowserServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = BrowserServer::new(Config::default());
//!     server.run().await.unwrap();
//! }
//! ```

pub mod backend;
pub mod config;
pub mod credential;
pub mod error;
pub mod handlers;
pub mod models;
pub mod retry;
pub mod router;
pub mod server;
pub mod service;
pub mod settings;
pub mod views;

// Re-exports for convenience
pub use backend::{AzureConnector, BackendConnector, MemoryBackend, MemoryBlob, StorageBackend};
pub use config::{Args, Config, DEFAULT_PORT, DEMO_ACCOUNT};
pub use credential::CredentialStrategy;
pub use error::{BackendError, BackendErrorKind, ContentsError, ContentsResult};
pub use retry::RetryPolicy;
pub use server::{BrowserServer, BrowserServerBuilder};
pub use service::ContentsService;
pub use settings::{AppSettingsSource, RawSettings, SettingsSource, StaticSettingsSource};
