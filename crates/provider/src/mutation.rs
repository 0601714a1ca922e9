use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reclaim_core::Recommendation;

use crate::error::ProviderError;

/// Result of applying a remediation to a cloud resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// The resource configuration after the mutation.
    pub applied_config: serde_json::Value,

    /// Realized monthly savings, when the mutation can report one.
    pub actual_monthly_savings: Option<f64>,
}

impl MutationOutcome {
    /// Create an outcome with the applied configuration.
    #[must_use]
    pub fn new(applied_config: serde_json::Value) -> Self {
        Self {
            applied_config,
            actual_monthly_savings: None,
        }
    }

    /// Attach the realized savings.
    #[must_use]
    pub fn with_savings(mut self, monthly: f64) -> Self {
        self.actual_monthly_savings = Some(monthly);
        self
    }
}

/// Strongly-typed mutation executor trait with native `async fn`.
///
/// This trait is **not** object-safe because it uses native `async fn`
/// methods. If you need dynamic dispatch, use [`DynMutationExecutor`]
/// instead -- every `MutationExecutor` automatically implements it via a
/// blanket implementation.
pub trait MutationExecutor: Send + Sync {
    /// Returns the unique name of this executor.
    fn name(&self) -> &str;

    /// Apply the remediation a recommendation describes.
    ///
    /// Invoked only after a recommendation reaches `approved` or the
    /// autonomous path; the executor performs the actual cloud mutation.
    fn apply(
        &self,
        recommendation: &Recommendation,
    ) -> impl std::future::Future<Output = Result<MutationOutcome, ProviderError>> + Send;

    /// Verify the executor can reach its cloud control plane.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), ProviderError>> + Send;
}

/// Object-safe mutation executor trait for use behind
/// `Arc<dyn DynMutationExecutor>`.
///
/// You generally should not implement this trait directly -- implement
/// [`MutationExecutor`] and rely on the blanket implementation.
#[async_trait]
pub trait DynMutationExecutor: Send + Sync {
    /// Returns the unique name of this executor.
    fn name(&self) -> &str;

    /// Apply the remediation a recommendation describes.
    async fn apply(
        &self,
        recommendation: &Recommendation,
    ) -> Result<MutationOutcome, ProviderError>;

    /// Verify the executor can reach its cloud control plane.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Blanket implementation bridging the static and dynamic dispatch worlds.
#[async_trait]
impl<T: MutationExecutor + Sync> DynMutationExecutor for T {
    fn name(&self) -> &str {
        MutationExecutor::name(self)
    }

    async fn apply(
        &self,
        recommendation: &Recommendation,
    ) -> Result<MutationOutcome, ProviderError> {
        MutationExecutor::apply(self, recommendation).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        MutationExecutor::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reclaim_core::{RecommendationType, ResourceType};

    use super::*;

    struct MockExecutor {
        executor_name: String,
        should_fail: bool,
    }

    impl MutationExecutor for MockExecutor {
        fn name(&self) -> &str {
            &self.executor_name
        }

        async fn apply(
            &self,
            _recommendation: &Recommendation,
        ) -> Result<MutationOutcome, ProviderError> {
            if self.should_fail {
                return Err(ProviderError::ExecutionFailed("mock failure".into()));
            }
            Ok(MutationOutcome::new(serde_json::json!({"deleted": true})).with_savings(12.0))
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn test_recommendation() -> Recommendation {
        Recommendation::new(
            "t",
            "vol-1",
            ResourceType::BlockVolume,
            RecommendationType::DeleteUnattached,
        )
    }

    #[tokio::test]
    async fn executor_apply_success() {
        let exec = MockExecutor {
            executor_name: "mock".into(),
            should_fail: false,
        };
        let outcome = MutationExecutor::apply(&exec, &test_recommendation())
            .await
            .unwrap();
        assert_eq!(outcome.actual_monthly_savings, Some(12.0));
    }

    #[tokio::test]
    async fn blanket_dyn_impl() {
        let exec: Arc<dyn DynMutationExecutor> = Arc::new(MockExecutor {
            executor_name: "dyn-mock".into(),
            should_fail: false,
        });
        assert_eq!(exec.name(), "dyn-mock");
        let outcome = exec.apply(&test_recommendation()).await.unwrap();
        assert_eq!(outcome.applied_config["deleted"], true);
        exec.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn dyn_apply_failure() {
        let exec: Arc<dyn DynMutationExecutor> = Arc::new(MockExecutor {
            executor_name: "sick".into(),
            should_fail: true,
        });
        let err = exec.apply(&test_recommendation()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ExecutionFailed(_)));
    }
}
