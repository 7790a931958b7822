//! Server configuration.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Account name used by the in-memory demo when none is configured.
pub const DEMO_ACCOUNT: &str = "devstoreaccount1";

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "blob-browser")]
#[command(about = "Browse Azure Blob Storage containers and blobs over HTTP")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port for the web server.
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON settings file, re-read on every request.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Serve a seeded in-memory account instead of Azure.
    #[arg(long)]
    pub in_memory: bool,

    /// Seconds after which a request's storage calls are cancelled.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            settings: None,
            in_memory: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            debug: false,
            silent: false,
        }
    }
}

/// Server configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port for the web server.
    pub port: u16,
    /// JSON settings file for the contents service.
    pub settings_file: Option<PathBuf>,
    /// Serve the in-memory demo account.
    pub in_memory: bool,
    /// Deadline for the storage calls of one request.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(Args::default())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            settings_file: args.settings,
            in_memory: args.in_memory,
            request_timeout: Duration::from_secs(args.request_timeout.max(1)),
        }
    }
}

impl Config {
    /// Returns the bind address for the web server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
