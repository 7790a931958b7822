//! Service settings, re-read on every contents operation.
//!
//! Settings come from an optional JSON file using the keys
//! `StorageAccountName`, `ForceManagedIdentity`, `ContainerTypes`,
//! `BlobEndpoint` and `PageSize`, overridden by the environment variables
//! `STORAGE_ACCOUNT_NAME`, `FORCE_MANAGED_IDENTITY`, `CONTAINER_TYPES`,
//! `BLOB_ENDPOINT` and `PAGE_SIZE`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::PathBuf;
use url::Url;

use crate::error::{ContentsError, ContentsResult};
use crate::models::ContainerTypeFilter;

/// Default number of items requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub const ENV_ACCOUNT_NAME: &str = "STORAGE_ACCOUNT_NAME";
pub const ENV_FORCE_MANAGED_IDENTITY: &str = "FORCE_MANAGED_IDENTITY";
pub const ENV_CONTAINER_TYPES: &str = "CONTAINER_TYPES";
pub const ENV_BLOB_ENDPOINT: &str = "BLOB_ENDPOINT";
pub const ENV_PAGE_SIZE: &str = "PAGE_SIZE";

/// Validated settings snapshot for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub account_name: String,
    pub force_managed_identity: bool,
    pub container_types: ContainerTypeFilter,
    /// Custom blob endpoint; the public cloud endpoint is used when unset.
    pub blob_endpoint: Option<Url>,
    pub page_size: NonZeroU32,
}

impl ServiceSettings {
    /// Returns the blob endpoint the account is reached at.
    pub fn blob_url(&self) -> String {
        match &self.blob_endpoint {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account_name),
        }
    }
}

/// Unvalidated settings as written in a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSettings {
    #[serde(default)]
    pub storage_account_name: Option<String>,
    #[serde(default)]
    pub force_managed_identity: Option<bool>,
    #[serde(default)]
    pub container_types: Option<String>,
    #[serde(default)]
    pub blob_endpoint: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl RawSettings {
    /// Creates raw settings for an account with everything else defaulted.
    pub fn for_account(account_name: impl Into<String>) -> Self {
        Self {
            storage_account_name: Some(account_name.into()),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> ContentsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, treating blank values as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ContentsResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let force_managed_identity = get(ENV_FORCE_MANAGED_IDENTITY)
            .map(|v| parse_bool(ENV_FORCE_MANAGED_IDENTITY, &v))
            .transpose()?;
        let page_size = get(ENV_PAGE_SIZE)
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| {
                    ContentsError::configuration(format!("{} must be a number, got '{}'", ENV_PAGE_SIZE, v))
                })
            })
            .transpose()?;

        Ok(Self {
            storage_account_name: get(ENV_ACCOUNT_NAME),
            force_managed_identity,
            container_types: get(ENV_CONTAINER_TYPES),
            blob_endpoint: get(ENV_BLOB_ENDPOINT),
            page_size,
        })
    }

    /// Returns `self` with every value set in `other` taking precedence.
    pub fn overlay(self, other: RawSettings) -> Self {
        Self {
            storage_account_name: other.storage_account_name.or(self.storage_account_name),
            force_managed_identity: other.force_managed_identity.or(self.force_managed_identity),
            container_types: other.container_types.or(self.container_types),
            blob_endpoint: other.blob_endpoint.or(self.blob_endpoint),
            page_size: other.page_size.or(self.page_size),
        }
    }

    /// Validates the raw values into a settings snapshot.
    pub fn resolve(&self) -> ContentsResult<ServiceSettings> {
        let account_name = self
            .storage_account_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ContentsError::configuration("StorageAccountName is not configured"))?;
        validate_account_name(account_name)?;

        let blob_endpoint = self
            .blob_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_endpoint)
            .transpose()?;

        let page_size = NonZeroU32::new(self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
            .ok_or_else(|| ContentsError::configuration("PageSize must be greater than zero"))?;

        Ok(ServiceSettings {
            account_name: account_name.to_string(),
            force_managed_identity: self.force_managed_identity.unwrap_or(false),
            container_types: self
                .container_types
                .as_deref()
                .map(ContainerTypeFilter::parse)
                .unwrap_or_default(),
            blob_endpoint,
            page_size,
        })
    }
}

/// Source of the settings each contents operation starts from.
pub trait SettingsSource: Send + Sync {
    /// Loads a fresh settings snapshot.
    fn load(&self) -> ContentsResult<ServiceSettings>;

    /// Returns the configured account name if the settings are valid.
    fn account_name(&self) -> Option<String> {
        self.load().ok().map(|s| s.account_name)
    }
}

/// Settings read from an optional JSON file with environment overrides.
///
/// Both are read again on every `load`, so edits apply to the next request.
#[derive(Debug, Clone, Default)]
pub struct AppSettingsSource {
    defaults: RawSettings,
    file: Option<PathBuf>,
    use_env: bool,
}

impl AppSettingsSource {
    /// Reads the given file (if any) and the process environment.
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            defaults: RawSettings::default(),
            file,
            use_env: true,
        }
    }

    /// Reads only the given file.
    pub fn file_only(file: impl Into<PathBuf>) -> Self {
        Self {
            defaults: RawSettings::default(),
            file: Some(file.into()),
            use_env: false,
        }
    }

    /// Sets values used when neither the file nor the environment has them.
    pub fn with_defaults(mut self, defaults: RawSettings) -> Self {
        self.defaults = defaults;
        self
    }

    fn read_file(&self) -> ContentsResult<RawSettings> {
        let Some(path) = &self.file else {
            return Ok(RawSettings::default());
        };
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                ContentsError::configuration(format!(
                    "invalid settings file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RawSettings::default()),
            Err(e) => Err(ContentsError::configuration(format!(
                "cannot read settings file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl SettingsSource for AppSettingsSource {
    fn load(&self) -> ContentsResult<ServiceSettings> {
        let mut raw = self.defaults.clone().overlay(self.read_file()?);
        if self.use_env {
            raw = raw.overlay(RawSettings::from_env()?);
        }
        raw.resolve()
    }
}

/// In-process settings that can be replaced while the service runs.
#[derive(Debug, Default)]
pub struct StaticSettingsSource {
    raw: RwLock<RawSettings>,
}

impl StaticSettingsSource {
    pub fn new(raw: RawSettings) -> Self {
        Self {
            raw: RwLock::new(raw),
        }
    }

    /// Applies `f` to the current settings.
    pub fn update(&self, f: impl FnOnce(&mut RawSettings)) {
        f(&mut *self.raw.write());
    }
}

impl SettingsSource for StaticSettingsSource {
    fn load(&self) -> ContentsResult<ServiceSettings> {
        self.raw.read().resolve()
    }
}

/// Validates a storage account name: 3-24 lowercase letters and digits.
fn validate_account_name(name: &str) -> ContentsResult<()> {
    if name.len() < 3 || name.len() > 24 {
        return Err(ContentsError::configuration(format!(
            "storage account name '{}' must be between 3 and 24 characters",
            name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ContentsError::configuration(format!(
            "storage account name '{}' can only contain lowercase letters and numbers",
            name
        )));
    }
    Ok(())
}

fn parse_endpoint(raw: &str) -> ContentsResult<Url> {
    let url = Url::parse(raw).map_err(|e| {
        ContentsError::configuration(format!("invalid blob endpoint '{}': {}", raw, e))
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ContentsError::configuration(format!(
            "blob endpoint '{}' must use http or https",
            raw
        )));
    }
    Ok(url)
}

fn parse_bool(key: &str, raw: &str) -> ContentsResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ContentsError::configuration(format!(
            "{} must be true or false, got '{}'",
            key, raw
        ))),
    }
}
