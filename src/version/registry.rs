//! Registry trait for fetching package publish records

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::RegistryMetadata;

/// Trait for fetching package metadata from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches publish times and manifests of every version of a package
    ///
    /// Every call performs a fresh request; nothing is cached between calls.
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "@types/node")
    ///
    /// # Returns
    /// * `Ok(RegistryMetadata)` - Publish times and manifests keyed by version
    /// * `Err(RegistryError::NotFound)` - The registry has no publish records for the package
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_metadata(&self, package_name: &str) -> Result<RegistryMetadata, RegistryError>;
}
