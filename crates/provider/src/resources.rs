use async_trait::async_trait;

use reclaim_core::ResourceSnapshot;

use crate::error::ProviderError;

/// Interface to the resource ingestion collaborator.
///
/// Implementations wrap the cloud inventory source (SDK calls, an inventory
/// service, or a fixture in tests) and return read-only snapshots.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// List all resource snapshots for a tenant.
    async fn list_resources(&self, tenant: &str) -> Result<Vec<ResourceSnapshot>, ProviderError>;

    /// Verify the ingestion source is reachable.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
