//! Credential strategy selection.

use crate::settings::ServiceSettings;

/// How a backend authenticates against the storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialStrategy {
    /// Managed identity only, for workloads hosted in Azure.
    ManagedIdentity,
    /// The SDK's default chain (environment, CLI login, managed identity...).
    DefaultChain,
}

impl CredentialStrategy {
    /// Selects the strategy for one operation from its settings snapshot.
    pub fn select(settings: &ServiceSettings) -> Self {
        if settings.force_managed_identity {
            CredentialStrategy::ManagedIdentity
        } else {
            CredentialStrategy::DefaultChain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStrategy::ManagedIdentity => "managed-identity",
            CredentialStrategy::DefaultChain => "default-chain",
        }
    }
}
