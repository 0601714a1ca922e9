pub mod config;
pub mod event;
pub mod history;
pub mod recommendation;
pub mod resource;

pub use config::AgentConfig;
pub use event::{AgentEvent, AgentEventType};
pub use history::{
    ExecutionOutcomeKind, HistoryPage, HistoryQuery, OptimizationRecord,
};
pub use recommendation::{
    ExecutionCandidate, ExecutionMode, Priority, Recommendation, RecommendationStatus,
    RecommendationType,
};
pub use resource::{ResourceMetrics, ResourceSnapshot, ResourceType};
