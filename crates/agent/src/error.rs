use thiserror::Error;

/// Errors that can occur while running the agent pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    /// An error occurred in the recommendation or history store.
    #[error("state error: {0}")]
    State(#[from] reclaim_state::StateError),

    /// An error from a collaborator (ingestion, mutation, notification).
    #[error("provider error: {0}")]
    Provider(#[from] reclaim_provider::ProviderError),

    /// The agent was misconfigured (missing components, invalid policy).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The referenced recommendation does not exist.
    #[error("recommendation not found: {0}")]
    RecommendationNotFound(String),
}
