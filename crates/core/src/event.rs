use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::ExecutionOutcomeKind;
use crate::recommendation::{ExecutionMode, RecommendationStatus};

/// A real-time event broadcast by the agent on every state transition.
///
/// Subscribers (dashboards, websocket bridges) receive enough metadata to
/// filter by tenant and event type without fetching the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Unique event identifier (UUID v7; the embedded timestamp supports
    /// ordered catch-up queries).
    pub id: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Tenant the event belongs to.
    pub tenant: String,
    /// The specific event payload.
    #[serde(flatten)]
    pub event_type: AgentEventType,
}

impl AgentEvent {
    /// Create an event stamped with a fresh UUID-v7 id.
    #[must_use]
    pub fn new(tenant: impl Into<String>, event_type: AgentEventType) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            tenant: tenant.into(),
            event_type,
        }
    }
}

/// The type-specific payload of an [`AgentEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEventType {
    /// A new recommendation entered the state machine.
    RecommendationCreated {
        recommendation_id: String,
        resource_id: String,
        status: RecommendationStatus,
        execution_mode: ExecutionMode,
    },
    /// A recommendation changed lifecycle state.
    StatusChanged {
        recommendation_id: String,
        resource_id: String,
        previous_status: RecommendationStatus,
        new_status: RecommendationStatus,
    },
    /// An execution attempt was recorded in the history ledger.
    ExecutionRecorded {
        recommendation_id: String,
        record_id: String,
        outcome: ExecutionOutcomeKind,
    },
    /// An optimization cycle finished.
    CycleCompleted {
        resources_scanned: usize,
        wasteful_found: usize,
        recommendations_created: usize,
    },
    /// A scheduled cycle was skipped (previous cycle still running).
    CycleSkipped { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serde_tags() {
        let event = AgentEvent::new(
            "tenant-1",
            AgentEventType::StatusChanged {
                recommendation_id: "r-1".into(),
                resource_id: "vol-1".into(),
                previous_status: RecommendationStatus::Pending,
                new_status: RecommendationStatus::Approved,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"status_changed\""));
        assert!(json.contains("\"previous_status\":\"pending\""));

        let back: AgentEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.event_type, AgentEventType::StatusChanged { .. }));
    }

    #[test]
    fn event_ids_are_unique() {
        let a = AgentEvent::new("t", AgentEventType::CycleSkipped { reason: "busy".into() });
        let b = AgentEvent::new("t", AgentEventType::CycleSkipped { reason: "busy".into() });
        assert_ne!(a.id, b.id);
    }
}
