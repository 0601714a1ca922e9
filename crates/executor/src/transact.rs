//! Transactional retry wrapper.
//!
//! Wraps a unit of work against the store, typically the atomic status flip
//! plus history append of
//! [`RecommendationStore::complete`](reclaim_state::RecommendationStore::complete),
//! and retries it under transient contention so a deadlock or serialization
//! conflict cannot leave the ledger half-written.

use std::future::Future;

use tracing::{debug, warn};

use reclaim_state::StateError;

use crate::config::TransactionConfig;

/// Run `op` until it succeeds, retrying only transient errors.
///
/// Errors where [`StateError::is_transient`] is `false` propagate
/// immediately without a retry. When retries exhaust, the last transient
/// error is returned. The delay between attempts follows the configured
/// strategy.
pub async fn with_retry<T, F, Fut>(
    config: &TransactionConfig,
    mut op: F,
) -> Result<T, StateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StateError>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let delay = config.strategy.delay_for(attempt);
                debug!(
                    attempt,
                    max_retries = config.max_retries,
                    error = %err,
                    delay_ms = %delay.as_millis(),
                    "transient store error, will retry"
                );
                tokio::time::sleep(delay).await;
                last_error = Some(err);
            }
            Err(err) => {
                if !err.is_transient() {
                    warn!(attempt, error = %err, "non-transient store error, giving up");
                }
                return Err(err);
            }
        }
    }

    // Only reachable when every attempt failed transiently.
    Err(last_error.expect("at least one error must have occurred"))
}
