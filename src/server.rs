//! HTTP server for the blob browser.

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::backend::{AzureConnector, BackendConnector, MemoryBackend};
use crate::config::{Config, DEMO_ACCOUNT};
use crate::router::{create_router, AppState};
use crate::service::ContentsService;
use crate::settings::{AppSettingsSource, RawSettings, SettingsSource};

/// Blob browser server.
pub struct BrowserServer {
    config: Arc<Config>,
    service: Arc<ContentsService>,
}

impl BrowserServer {
    /// Creates a server whose backend follows the configuration.
    pub fn new(config: Config) -> Self {
        BrowserServerBuilder::new().config(config).build()
    }

    /// Creates a server around an existing contents service.
    pub fn with_service(config: Config, service: Arc<ContentsService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }

    /// Returns the router with middleware applied.
    pub fn app(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            request_timeout: self.config.request_timeout,
        };

        create_router(state).layer(TraceLayer::new_for_http().make_span_with(
            |request: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
    }

    /// Binds the configured address and runs the server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Runs the server on an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = listener.local_addr()?;
        match self.service.settings().account_name() {
            Some(account) => info!("Blob browser is starting at http://{} for account {}", addr, account),
            None => info!("Blob browser is starting at http://{} (settings incomplete)", addr),
        }

        axum::serve(listener, self.app()).await?;
        Ok(())
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        self.config.bind_address()
    }

    /// Returns the base URL of the browser.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_address())
    }
}

/// Builder for creating a browser server.
pub struct BrowserServerBuilder {
    config: Config,
    settings: Option<Arc<dyn SettingsSource>>,
    connector: Option<Arc<dyn BackendConnector>>,
}

impl BrowserServerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            settings: None,
            connector: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the settings source.
    pub fn settings(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the backend connector.
    pub fn connector(mut self, connector: Arc<dyn BackendConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the server.
    ///
    /// Without explicit parts, settings come from the configured file and
    /// the environment, and storage is Azure or, in memory mode, a seeded
    /// demo account.
    pub fn build(self) -> BrowserServer {
        let in_memory = self.config.in_memory;
        let settings: Arc<dyn SettingsSource> = match self.settings {
            Some(settings) => settings,
            None => {
                let mut source = AppSettingsSource::new(self.config.settings_file.clone());
                if in_memory {
                    source = source.with_defaults(RawSettings::for_account(DEMO_ACCOUNT));
                }
                Arc::new(source)
            }
        };
        let connector: Arc<dyn BackendConnector> = match self.connector {
            Some(connector) => connector,
            None if in_memory => Arc::new(Arc::new(MemoryBackend::demo()).connector()),
            None => Arc::new(AzureConnector::default()),
        };

        let service = Arc::new(ContentsService::new(settings, connector));
        BrowserServer::with_service(self.config, service)
    }
}

impl Default for BrowserServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
