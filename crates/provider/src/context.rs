use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A similarity-search hit from the vector-context store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Document identifier.
    pub id: String,
    /// The retrieved content.
    pub content: String,
    /// Similarity score, higher is closer.
    pub score: f64,
}

/// Interface to the vector-context store.
///
/// The store enriches recommendations with historical context; it is a
/// non-critical dependency. Every call goes through the circuit breaker with
/// an empty result as the fallback, and implementations must bound each
/// lookup with a hard timeout.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Retrieve the `k` most similar context items for a query.
    async fn retrieve_context(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ContextItem>, ProviderError>;
}
