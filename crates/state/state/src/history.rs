use async_trait::async_trait;

use reclaim_core::{HistoryPage, HistoryQuery, OptimizationRecord};

use crate::error::StateError;

/// Trait for the append-only optimization history ledger.
///
/// Records are written exactly once per execution attempt and never mutated
/// or deleted. Implementations must be `Send + Sync`.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record to the ledger.
    async fn record(&self, record: OptimizationRecord) -> Result<(), StateError>;

    /// Retrieve a record by its unique id.
    async fn get(&self, id: &str) -> Result<Option<OptimizationRecord>, StateError>;

    /// All execution attempts for one recommendation, oldest first.
    async fn for_recommendation(
        &self,
        recommendation_id: &str,
    ) -> Result<Vec<OptimizationRecord>, StateError>;

    /// Query the ledger with filters and pagination, newest first.
    async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage, StateError>;
}
