//! Container data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata key that carries a container's type.
pub const CONTAINER_TYPE_KEY: &str = "containerType";

/// A container as enumerated by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItem {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    /// Metadata pairs in the order the backend enumerated them.
    pub metadata: Vec<(String, String)>,
}

impl ContainerItem {
    pub fn new(name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_modified,
            metadata: Vec::new(),
        }
    }

    /// Returns the value of a metadata key. Keys compare ASCII case-insensitively.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Container summary shown by the container list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    /// `key=value` pairs joined by `;`, unset when the container has no metadata.
    pub metadata: Option<String>,
}

impl From<ContainerItem> for ContainerInfo {
    fn from(item: ContainerItem) -> Self {
        Self {
            metadata: format_metadata(&item.metadata),
            name: item.name,
            last_modified: item.last_modified,
        }
    }
}

/// Flattens metadata pairs into `key=value;key=value`, keeping their order.
pub fn format_metadata(pairs: &[(String, String)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    Some(
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";"),
    )
}

/// Set of container types a listing is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTypeFilter {
    types: BTreeSet<String>,
}

impl ContainerTypeFilter {
    /// Parses a pipe-delimited list such as `"logs|audit"`.
    ///
    /// Entries are lowercased and trimmed; empty entries are dropped.
    pub fn parse(raw: &str) -> Self {
        let types = raw
            .to_lowercase()
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { types }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    /// Returns true if the container passes the filter.
    ///
    /// An empty filter admits everything. Otherwise the container's
    /// `containerType` value must equal one of the configured types exactly.
    pub fn admits(&self, container: &ContainerItem) -> bool {
        if self.types.is_empty() {
            return true;
        }
        container
            .metadata_value(CONTAINER_TYPE_KEY)
            .is_some_and(|value| self.types.contains(value))
    }
}
