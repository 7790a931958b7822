//! Request routing for the blob browser.

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;

use crate::handlers;
use crate::service::ContentsService;

/// Application state shared between handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContentsService>,
    /// Deadline for the storage calls of one request.
    pub request_timeout: Duration,
}

/// Creates the main router for the browser.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/storage", get(handlers::list_containers))
        .route("/storage/:container", get(handlers::list_blobs))
        // Blob names may contain '/'
        .route("/storage/:container/*blob", get(handlers::show_blob))
        .with_state(state)
}
