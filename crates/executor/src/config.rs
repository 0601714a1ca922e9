use std::time::Duration;

use crate::retry::RetryStrategy;

/// Configuration for the [`MutationRunner`](crate::MutationRunner).
///
/// Controls retry behaviour, concurrency limits, and per-mutation timeouts.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of retry attempts before a mutation is considered
    /// failed.
    pub max_retries: u32,
    /// Strategy used to compute the delay between retries.
    pub retry_strategy: RetryStrategy,
    /// Maximum wall-clock time allowed for a single mutation call.
    pub execution_timeout: Duration,
    /// Maximum number of mutations that may run concurrently. Enforced via a
    /// [`tokio::sync::Semaphore`].
    pub max_concurrent: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_strategy: RetryStrategy::default(),
            execution_timeout: Duration::from_secs(30),
            max_concurrent: 4,
        }
    }
}

/// Configuration for [`with_retry`](crate::with_retry), the transactional
/// retry wrapper around multi-step store mutations.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Strategy used to compute the delay between retries.
    pub strategy: RetryStrategy,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            strategy: RetryStrategy::Linear {
                base: Duration::from_millis(50),
                max: Duration::from_secs(1),
            },
        }
    }
}
