//! Built-in collaborator implementations for the standalone daemon.
//!
//! Real deployments wire cloud-backed implementations; the daemon ships a
//! file-backed resource provider and log-only mutation/notification sinks so
//! the control loop can run end to end without touching a cloud account.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use reclaim_core::{Recommendation, ResourceSnapshot};
use reclaim_provider::{
    MutationExecutor, MutationOutcome, NotificationEvent, Notifier, ProviderError,
    ResourceProvider,
};

/// Resource provider backed by a JSON file of snapshots.
///
/// The file is re-read on every cycle; a missing path yields an empty fleet
/// rather than an error.
pub struct FileResourceProvider {
    path: Option<PathBuf>,
}

impl FileResourceProvider {
    /// Create a provider for an optional snapshot file.
    pub fn new(path: Option<impl Into<PathBuf>>) -> Self {
        Self {
            path: path.map(Into::into),
        }
    }
}

#[async_trait]
impl ResourceProvider for FileResourceProvider {
    async fn list_resources(&self, tenant: &str) -> Result<Vec<ResourceSnapshot>, ProviderError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProviderError::Connection(format!("{}: {e}", path.display())))?;
        let snapshots: Vec<ResourceSnapshot> = serde_json::from_str(&contents)
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;
        Ok(snapshots
            .into_iter()
            .filter(|s| s.tenant == tenant)
            .collect())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.path {
            Some(path) if !path.exists() => {
                Err(ProviderError::NotFound(path.display().to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Mutation executor that logs the remediation instead of performing it.
pub struct LogMutationExecutor;

impl MutationExecutor for LogMutationExecutor {
    fn name(&self) -> &str {
        "log"
    }

    async fn apply(
        &self,
        recommendation: &Recommendation,
    ) -> Result<MutationOutcome, ProviderError> {
        info!(
            recommendation_id = %recommendation.id,
            resource_id = %recommendation.resource_id,
            recommendation_type = %recommendation.recommendation_type,
            projected_monthly_savings = recommendation.projected_monthly_savings,
            "would apply remediation"
        );
        Ok(MutationOutcome::new(serde_json::json!({
            "simulated": true,
            "recommendation_type": recommendation.recommendation_type,
        })))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Notifier that writes notifications to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ProviderError> {
        match event {
            NotificationEvent::ApprovalRequested { recommendation, .. } => info!(
                recommendation_id = %recommendation.id,
                resource_id = %recommendation.resource_id,
                risk = recommendation.risk_level,
                projected_monthly_savings = recommendation.projected_monthly_savings,
                "approval requested"
            ),
            NotificationEvent::ExecutionCompleted {
                recommendation_id,
                outcome,
            } => info!(%recommendation_id, outcome = %outcome, "execution completed"),
            NotificationEvent::CycleFailed { error } => {
                info!(%error, "optimization cycle failed");
            }
        }
        Ok(())
    }
}
