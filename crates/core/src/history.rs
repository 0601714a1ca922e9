use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recommendation::{Recommendation, RecommendationType};

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcomeKind {
    Executed,
    Failed,
}

impl ExecutionOutcomeKind {
    /// Return the lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionOutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, append-only record of one execution attempt.
///
/// Exactly one record is written per attempt, in the same unit of work as the
/// recommendation's status change. Records are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecord {
    /// Unique identifier for this record (UUID v7).
    pub id: String,

    /// The recommendation this attempt executed.
    pub recommendation_id: String,

    /// Tenant that owns the target resource.
    pub tenant: String,

    /// Identifier of the target resource.
    pub resource_id: String,

    /// The remediation type that was applied.
    pub recommendation_type: RecommendationType,

    /// Who triggered the execution: `"autonomous-agent"` or an approver id.
    pub executed_by: String,

    /// Resource configuration before the mutation.
    pub before_config: serde_json::Value,

    /// Resource configuration after the mutation (null on failure).
    pub after_config: serde_json::Value,

    /// Whether the attempt succeeded.
    pub outcome: ExecutionOutcomeKind,

    /// Realized monthly savings, when the mutation reported one.
    pub actual_monthly_savings: Option<f64>,

    /// Error description for failed attempts.
    pub error: Option<String>,

    /// When the attempt completed.
    pub executed_at: DateTime<Utc>,

    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: u64,
}

impl OptimizationRecord {
    /// Build a record for a successful execution.
    #[must_use]
    pub fn executed(
        recommendation: &Recommendation,
        executed_by: impl Into<String>,
        after_config: serde_json::Value,
        actual_monthly_savings: Option<f64>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            recommendation_id: recommendation.id.clone(),
            tenant: recommendation.tenant.clone(),
            resource_id: recommendation.resource_id.clone(),
            recommendation_type: recommendation.recommendation_type,
            executed_by: executed_by.into(),
            before_config: recommendation.current_config.clone(),
            after_config,
            outcome: ExecutionOutcomeKind::Executed,
            actual_monthly_savings,
            error: None,
            executed_at: Utc::now(),
            duration_ms,
        }
    }

    /// Build a record for a failed execution.
    #[must_use]
    pub fn failed(
        recommendation: &Recommendation,
        executed_by: impl Into<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            recommendation_id: recommendation.id.clone(),
            tenant: recommendation.tenant.clone(),
            resource_id: recommendation.resource_id.clone(),
            recommendation_type: recommendation.recommendation_type,
            executed_by: executed_by.into(),
            before_config: recommendation.current_config.clone(),
            after_config: serde_json::Value::Null,
            outcome: ExecutionOutcomeKind::Failed,
            actual_monthly_savings: None,
            error: Some(error.into()),
            executed_at: Utc::now(),
            duration_ms,
        }
    }
}

/// Query parameters for searching the optimization history.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Filter by tenant.
    pub tenant: Option<String>,
    /// Filter by target resource.
    pub resource_id: Option<String>,
    /// Filter by outcome.
    pub outcome: Option<ExecutionOutcomeKind>,
    /// Only records executed at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only records executed at or before this time.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of records to return (default 50, max 1000).
    pub limit: Option<u32>,
    /// Number of records to skip for pagination.
    pub offset: Option<u32>,
}

impl HistoryQuery {
    /// Return the effective limit, clamped to 1..=1000, defaulting to 50.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, 1000)
    }

    /// Return the effective offset, defaulting to 0.
    #[must_use]
    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// A paginated page of optimization records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    /// The records matching the query.
    pub records: Vec<OptimizationRecord>,
    /// Total number of records matching the query (before pagination).
    pub total: u64,
    /// The limit used for this page.
    pub limit: u32,
    /// The offset used for this page.
    pub offset: u32,
}
