use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reclaim_core::{ExecutionOutcomeKind, Recommendation};

use crate::context::ContextItem;
use crate::error::ProviderError;

/// An event worth telling a human about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A recommendation is waiting for human approval. `context` carries
    /// similar past optimizations when the context store could supply them.
    ApprovalRequested {
        recommendation: Recommendation,
        #[serde(default)]
        context: Vec<ContextItem>,
    },
    /// An execution attempt finished.
    ExecutionCompleted {
        recommendation_id: String,
        outcome: ExecutionOutcomeKind,
    },
    /// An optimization cycle failed outright.
    CycleFailed { error: String },
}

/// Interface to the chat/notification collaborator.
///
/// Callers treat notification as fire-and-forget: a failed `notify` is
/// logged, never propagated, and never fails the caller's primary operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification.
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ProviderError>;
}
