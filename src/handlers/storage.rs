//! Container and blob page handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::warn;

use super::RequestDeadline;
use crate::error::ContentsError;
use crate::router::AppState;
use crate::views::{render, BlobDetail, BlobRow, BlobView, BlobsView, ContainerRow, ContainersView};

/// Query string of the blob list page.
#[derive(Debug, Default, Deserialize)]
pub struct BlobsQuery {
    /// Date shown with the listing, `YYYY-MM-DD`.
    pub date: Option<String>,
}

/// GET /storage - Lists containers.
pub async fn list_containers(State(state): State<AppState>) -> Response {
    let deadline = RequestDeadline::start(state.request_timeout);
    match state.service.list_containers(deadline.token()).await {
        Ok(containers) => {
            let view = ContainersView {
                containers: containers.iter().map(ContainerRow::from).collect(),
                message: None,
            };
            render(&view, StatusCode::OK)
        }
        Err(e) => {
            let view = ContainersView {
                containers: Vec::new(),
                message: Some(e.to_string()),
            };
            render(&view, failure_status("list containers", &e))
        }
    }
}

/// GET /storage/:container - Lists the blobs of a container.
pub async fn list_blobs(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(query): Query<BlobsQuery>,
) -> Response {
    let date = query
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());
    let mut view = BlobsView::new(&container, date);

    let deadline = RequestDeadline::start(state.request_timeout);
    let status = match state
        .service
        .list_blobs(&container, Some(date), deadline.token())
        .await
    {
        Ok(blobs) => {
            view.blobs = blobs.iter().map(|b| BlobRow::new(&container, b)).collect();
            StatusCode::OK
        }
        Err(e) => {
            view.message = Some(e.to_string());
            failure_status("list blobs", &e)
        }
    };
    render(&view, status)
}

/// GET /storage/:container/*blob - Shows one blob.
pub async fn show_blob(
    State(state): State<AppState>,
    Path((container, blob)): Path<(String, String)>,
) -> Response {
    let mut view = BlobView::new(&container, &blob);

    let deadline = RequestDeadline::start(state.request_timeout);
    let status = match state.service.get_blob(&container, &blob, deadline.token()).await {
        Ok(content) => {
            view.blob = Some(BlobDetail::from(&content));
            StatusCode::OK
        }
        Err(e) => {
            view.message = Some(e.to_string());
            failure_status("get blob", &e)
        }
    };
    render(&view, status)
}

fn failure_status(operation: &str, err: &ContentsError) -> StatusCode {
    warn!("Failed to {}: {}", operation, err);
    err.status_code()
}
