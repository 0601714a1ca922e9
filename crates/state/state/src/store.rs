use async_trait::async_trait;

use reclaim_core::{OptimizationRecord, Recommendation, RecommendationStatus};

use crate::error::StateError;

/// Trait for persisting recommendation records.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Records are never deleted; the full set is the audit trail.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Insert a new recommendation, enforcing the dedupe invariant.
    ///
    /// The check for an existing active (pending or approved) recommendation
    /// for the same `(tenant, resource_id)` and the insert must be one atomic
    /// operation: this is the authoritative guard, and in-memory pre-checks
    /// by callers are a fast path only. Returns
    /// [`StateError::DuplicateActive`] when an active record exists.
    async fn create(&self, recommendation: &Recommendation) -> Result<(), StateError>;

    /// Get a recommendation by id. Returns `None` if not found.
    async fn get(&self, id: &str) -> Result<Option<Recommendation>, StateError>;

    /// Find the active (pending or approved) recommendation for a resource,
    /// if one exists. At most one can exist at a time.
    async fn find_active(
        &self,
        tenant: &str,
        resource_id: &str,
    ) -> Result<Option<Recommendation>, StateError>;

    /// List all recommendations for a tenant, newest first.
    async fn list(&self, tenant: &str) -> Result<Vec<Recommendation>, StateError>;

    /// Transition a recommendation to a new status.
    ///
    /// Validates the transition against the state machine
    /// ([`RecommendationStatus::can_transition`]) and bumps `updated_at`.
    /// Returns the updated record, [`StateError::NotFound`] for an unknown
    /// id, or [`StateError::InvalidTransition`] for an illegal edge.
    async fn transition(
        &self,
        id: &str,
        to: RecommendationStatus,
    ) -> Result<Recommendation, StateError>;

    /// Finalize an execution attempt: transition to a terminal status
    /// (`Executed` or `Failed`) and append the matching history record in one
    /// unit of work.
    ///
    /// Both writes happen atomically or not at all, so a crash or a transient
    /// failure can never leave a status flip without its ledger entry (or
    /// vice versa). `to` must be `Executed` or `Failed`.
    async fn complete(
        &self,
        id: &str,
        to: RecommendationStatus,
        record: OptimizationRecord,
    ) -> Result<Recommendation, StateError>;
}
