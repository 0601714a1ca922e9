use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use reclaim_core::Recommendation;
use reclaim_provider::{DynMutationExecutor, MutationOutcome, ProviderError};

use crate::config::RunnerConfig;

/// Terminal result of running one mutation.
#[derive(Debug, Clone)]
pub enum MutationResult {
    /// The mutation was applied to the cloud resource.
    Applied(MutationOutcome),
    /// The mutation failed after all retries or on a permanent error.
    Failed(MutationFailure),
}

/// Failure detail for a mutation that did not land.
#[derive(Debug, Clone)]
pub struct MutationFailure {
    /// Short error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether the error was transient.
    pub retryable: bool,
    /// Number of attempts made.
    pub attempts: u32,
}

/// Runs cloud mutations with bounded concurrency, per-call timeouts, and
/// retries on transient provider errors.
///
/// A semaphore permit is acquired before each mutation so at most
/// [`RunnerConfig::max_concurrent`] mutations are in flight. Retryable
/// errors are retried up to [`RunnerConfig::max_retries`] times with delays
/// from the configured [`RetryStrategy`](crate::RetryStrategy); anything
/// else fails immediately.
pub struct MutationRunner {
    config: RunnerConfig,
    semaphore: Arc<Semaphore>,
}

impl MutationRunner {
    /// Create a runner from the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, semaphore }
    }

    /// Return a reference to the runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Apply a recommendation through the given mutation executor.
    #[instrument(
        skip(self, recommendation, executor),
        fields(recommendation.id = %recommendation.id, attempt)
    )]
    pub async fn run(
        &self,
        recommendation: &Recommendation,
        executor: &dyn DynMutationExecutor,
    ) -> MutationResult {
        // Cancel-safe: dropping the future while waiting never leaks a permit.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore should never be closed");

        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.config.max_retries {
            tracing::Span::current().record("attempt", attempt);
            debug!(
                recommendation_id = %recommendation.id,
                executor = executor.name(),
                attempt,
                "applying mutation"
            );

            let result = tokio::time::timeout(
                self.config.execution_timeout,
                executor.apply(recommendation),
            )
            .await;

            let err = match result {
                Ok(Ok(outcome)) => {
                    debug!(recommendation_id = %recommendation.id, "mutation applied");
                    return MutationResult::Applied(outcome);
                }
                Ok(Err(err)) => err,
                Err(_elapsed) => ProviderError::Timeout(self.config.execution_timeout),
            };

            if err.is_retryable() && attempt < self.config.max_retries {
                let delay = self.config.retry_strategy.delay_for(attempt);
                warn!(
                    recommendation_id = %recommendation.id,
                    attempt,
                    error = %err,
                    delay_ms = %delay.as_millis(),
                    "retryable mutation error, will retry"
                );
                tokio::time::sleep(delay).await;
                last_error = Some(err);
            } else {
                warn!(
                    recommendation_id = %recommendation.id,
                    attempt,
                    error = %err,
                    retryable = err.is_retryable(),
                    "mutation failed"
                );
                return MutationResult::Failed(MutationFailure {
                    code: error_code(&err),
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                    attempts: attempt + 1,
                });
            }
        }

        // Every attempt failed with a retryable error.
        let err = last_error.expect("at least one error must have occurred");
        MutationResult::Failed(MutationFailure {
            code: error_code(&err),
            message: err.to_string(),
            retryable: true,
            attempts: self.config.max_retries + 1,
        })
    }
}

/// Map a [`ProviderError`] variant to a short error code string.
fn error_code(err: &ProviderError) -> String {
    match err {
        ProviderError::NotFound(_) => "NOT_FOUND".into(),
        ProviderError::ExecutionFailed(_) => "EXECUTION_FAILED".into(),
        ProviderError::Timeout(_) => "TIMEOUT".into(),
        ProviderError::Connection(_) => "CONNECTION".into(),
        ProviderError::Configuration(_) => "CONFIGURATION".into(),
        ProviderError::RateLimited => "RATE_LIMITED".into(),
        ProviderError::Serialization(_) => "SERIALIZATION".into(),
    }
}
