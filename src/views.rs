//! HTML view models rendered by the web handlers.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::error;

use crate::models::{format_metadata, BlobContent, BlobInfo, ContainerInfo, Metadata};

/// Characters escaped inside one path segment of a link.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Home page.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexView {
    pub account_name: Option<String>,
    pub message: Option<String>,
}

/// Container list page.
#[derive(Template)]
#[template(path = "containers.html")]
pub struct ContainersView {
    pub containers: Vec<ContainerRow>,
    pub message: Option<String>,
}

pub struct ContainerRow {
    pub name: String,
    pub href: String,
    pub last_modified: String,
    pub metadata: String,
}

impl From<&ContainerInfo> for ContainerRow {
    fn from(container: &ContainerInfo) -> Self {
        Self {
            name: container.name.clone(),
            href: container_href(&container.name),
            last_modified: format_timestamp(Some(container.last_modified)),
            metadata: container.metadata.clone().unwrap_or_default(),
        }
    }
}

/// Blob list page of one container.
#[derive(Template)]
#[template(path = "blobs.html")]
pub struct BlobsView {
    pub container_name: String,
    pub date: String,
    pub blobs: Vec<BlobRow>,
    pub message: Option<String>,
}

impl BlobsView {
    pub fn new(container_name: &str, date: NaiveDate) -> Self {
        Self {
            container_name: container_name.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            blobs: Vec::new(),
            message: None,
        }
    }
}

pub struct BlobRow {
    pub name: String,
    pub href: String,
    pub last_modified: String,
    pub size: String,
    pub tier: String,
    pub metadata: String,
}

impl BlobRow {
    pub fn new(container: &str, blob: &BlobInfo) -> Self {
        Self {
            name: blob.name.clone(),
            href: blob_href(container, &blob.name),
            last_modified: format_timestamp(blob.last_modified),
            size: blob.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            tier: blob.tier.clone().unwrap_or_else(|| "-".to_string()),
            metadata: format_metadata(&sorted_pairs(&blob.metadata)).unwrap_or_default(),
        }
    }
}

/// Detail page of one blob.
#[derive(Template)]
#[template(path = "blob.html")]
pub struct BlobView {
    pub container_name: String,
    pub container_href: String,
    pub blob_name: String,
    pub blob: Option<BlobDetail>,
    pub message: Option<String>,
}

impl BlobView {
    pub fn new(container_name: &str, blob_name: &str) -> Self {
        Self {
            container_name: container_name.to_string(),
            container_href: container_href(container_name),
            blob_name: blob_name.to_string(),
            blob: None,
            message: None,
        }
    }
}

pub struct BlobDetail {
    pub content: String,
    pub metadata: Vec<(String, String)>,
    pub tags: Vec<(String, String)>,
}

impl From<&BlobContent> for BlobDetail {
    fn from(blob: &BlobContent) -> Self {
        Self {
            content: blob.content.clone(),
            metadata: sorted_pairs(&blob.metadata),
            tags: sorted_pairs(&blob.tags),
        }
    }
}

/// Renders a template with the given status.
pub fn render<T: Template>(view: &T, status: StatusCode) -> Response {
    match view.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render view: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    }
}

/// Link to the blob list of a container.
pub fn container_href(container: &str) -> String {
    format!("/storage/{}", utf8_percent_encode(container, PATH_SEGMENT))
}

/// Link to a blob; `/` in the blob name stays a path separator.
pub fn blob_href(container: &str, blob: &str) -> String {
    let path = blob
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", container_href(container), path)
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn sorted_pairs(map: &Metadata) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    pairs.sort();
    pairs
}
