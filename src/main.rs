//! Blob browser: browse Azure Blob Storage containers and blobs over HTTP.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use blob_browser::{Args, BrowserServer, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over the flags
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = Config::from(args);
    let mode = if config.in_memory {
        "in-memory demo account"
    } else {
        "Azure Blob Storage"
    };
    let settings = config
        .settings_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "environment only".to_string());

    let server = BrowserServer::new(config);

    println!(
        r#"
Blob browser is starting at {}

Storage: {}
Settings: {}

Press Ctrl+C to stop the server.
"#,
        server.base_url(),
        mode,
        settings
    );

    server.run().await
}
