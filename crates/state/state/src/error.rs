use thiserror::Error;

use reclaim_core::RecommendationStatus;

/// Errors from recommendation and history store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Transient concurrency contention: deadlock, serialization conflict,
    /// or a lost optimistic-locking race. Safe to retry.
    #[error("storage contention: {0}")]
    Contention(String),

    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The operation did not complete within the allowed duration.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The referenced record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// An active recommendation already exists for the resource.
    #[error("active recommendation already exists for resource {resource_id}")]
    DuplicateActive { resource_id: String },

    /// The requested status change is not a legal transition.
    #[error("illegal transition: {from} -> {to}")]
    InvalidTransition {
        from: RecommendationStatus,
        to: RecommendationStatus,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend error.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StateError {
    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry. Only contention, connection, and timeout errors qualify;
    /// everything else propagates immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Contention(_) | Self::Connection(_) | Self::Timeout(_)
        )
    }
}
