use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::ResourceType;

/// The fixed set of remediation types the agent can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationType {
    DeleteUnattached,
    ReleaseAddress,
    DeleteOrphaned,
    DeleteUnused,
    SnapshotCleanup,
    VolumeRightsizing,
    StorageTiering,
    LambdaRightsizing,
    GatewayConsolidation,
    LbConsolidation,
    Rightsizing,
    Scheduling,
}

impl RecommendationType {
    /// All known recommendation types, in display order.
    pub const ALL: [Self; 12] = [
        Self::DeleteUnattached,
        Self::ReleaseAddress,
        Self::DeleteOrphaned,
        Self::DeleteUnused,
        Self::SnapshotCleanup,
        Self::VolumeRightsizing,
        Self::StorageTiering,
        Self::LambdaRightsizing,
        Self::GatewayConsolidation,
        Self::LbConsolidation,
        Self::Rightsizing,
        Self::Scheduling,
    ];

    /// Return the canonical kebab-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeleteUnattached => "delete-unattached",
            Self::ReleaseAddress => "release-address",
            Self::DeleteOrphaned => "delete-orphaned",
            Self::DeleteUnused => "delete-unused",
            Self::SnapshotCleanup => "snapshot-cleanup",
            Self::VolumeRightsizing => "volume-rightsizing",
            Self::StorageTiering => "storage-tiering",
            Self::LambdaRightsizing => "lambda-rightsizing",
            Self::GatewayConsolidation => "gateway-consolidation",
            Self::LbConsolidation => "lb-consolidation",
            Self::Rightsizing => "rightsizing",
            Self::Scheduling => "scheduling",
        }
    }

    /// Whether this remediation removes the resource outright.
    #[must_use]
    pub fn is_deletion(self) -> bool {
        matches!(
            self,
            Self::DeleteUnattached
                | Self::ReleaseAddress
                | Self::DeleteOrphaned
                | Self::DeleteUnused
                | Self::SnapshotCleanup
        )
    }
}

impl std::fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecommendationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown recommendation type: {s}"))
    }
}

/// How a recommendation is allowed to reach execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Executed immediately by the agent, without human approval.
    Autonomous,
    /// Held pending until a human approves or rejects it.
    Hitl,
}

impl ExecutionMode {
    /// Return the lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::Hitl => "hitl",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a recommendation.
///
/// Legal transitions: `Pending` → `Approved`/`Rejected`/`Executed`/`Failed`,
/// `Approved` → `Executed`/`Failed`. The direct `Pending` → `Executed`/`Failed`
/// edges are the autonomous path. `Rejected`, `Executed`, and `Failed` are
/// terminal; records are never deleted, only transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
    Failed,
}

impl RecommendationStatus {
    /// Return the lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }

    /// An active recommendation blocks creation of a new one for the same
    /// resource (the dedupe invariant).
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Terminal states allow no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Executed | Self::Failed)
    }

    /// Check whether a transition from `self` to `to` is legal.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        match self {
            Self::Pending => matches!(
                to,
                Self::Approved | Self::Rejected | Self::Executed | Self::Failed
            ),
            Self::Approved => matches!(to, Self::Executed | Self::Failed),
            Self::Rejected | Self::Executed | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting priority, derived from projected monthly savings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Derive a priority from projected monthly savings.
    #[must_use]
    pub fn from_monthly_savings(savings: f64) -> Self {
        if savings >= 2000.0 {
            Self::Critical
        } else if savings >= 500.0 {
            Self::High
        } else if savings >= 100.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A remediation opportunity for one resource.
///
/// Created by the classification pipeline, mutated only through the state
/// machine, never deleted. The full set of records is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant that owns the target resource.
    pub tenant: String,

    /// Identifier of the target resource.
    pub resource_id: String,

    /// Type of the target resource.
    pub resource_type: ResourceType,

    /// The recommended remediation.
    pub recommendation_type: RecommendationType,

    /// Reporting priority.
    pub priority: Priority,

    /// Risk score, 0 (safe) to 10 (dangerous).
    pub risk_level: u8,

    /// Whether the agent may execute this without approval.
    pub execution_mode: ExecutionMode,

    /// Current lifecycle state.
    pub status: RecommendationStatus,

    /// Projected monthly savings in account currency.
    pub projected_monthly_savings: f64,

    /// Why the resource was flagged.
    pub reason: String,

    /// Resource configuration before remediation.
    pub current_config: serde_json::Value,

    /// Proposed configuration after remediation.
    pub recommended_config: serde_json::Value,

    /// When the recommendation was created.
    pub created_at: DateTime<Utc>,

    /// When the recommendation last changed state.
    pub updated_at: DateTime<Utc>,
}

impl Recommendation {
    /// Create a pending recommendation with a fresh UUID-v4 id.
    #[must_use]
    pub fn new(
        tenant: impl Into<String>,
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        recommendation_type: RecommendationType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.into(),
            resource_id: resource_id.into(),
            resource_type,
            recommendation_type,
            priority: Priority::Low,
            risk_level: 0,
            execution_mode: ExecutionMode::Hitl,
            status: RecommendationStatus::Pending,
            projected_monthly_savings: 0.0,
            reason: String::new(),
            current_config: serde_json::Value::Null,
            recommended_config: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the risk level.
    #[must_use]
    pub fn with_risk_level(mut self, risk: u8) -> Self {
        self.risk_level = risk;
        self
    }

    /// Set projected monthly savings and derive the priority from them.
    #[must_use]
    pub fn with_projected_savings(mut self, monthly: f64) -> Self {
        self.projected_monthly_savings = monthly;
        self.priority = Priority::from_monthly_savings(monthly);
        self
    }

    /// Set the execution mode.
    #[must_use]
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Set the human-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the before/after configuration snapshots.
    #[must_use]
    pub fn with_configs(
        mut self,
        current: serde_json::Value,
        recommended: serde_json::Value,
    ) -> Self {
        self.current_config = current;
        self.recommended_config = recommended;
        self
    }

    /// Projected annual savings (monthly × 12), the value the approval
    /// ceiling is compared against.
    #[must_use]
    pub fn projected_annual_savings(&self) -> f64 {
        self.projected_monthly_savings * 12.0
    }

    /// Build the pure input for execution-mode resolution.
    #[must_use]
    pub fn as_candidate(&self) -> ExecutionCandidate {
        ExecutionCandidate {
            recommendation_type: self.recommendation_type,
            risk_level: self.risk_level,
            projected_annual_savings: self.projected_annual_savings(),
        }
    }
}

/// The inputs that determine whether a recommendation may execute
/// autonomously. Deliberately detached from the full record so the resolver
/// stays a pure function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionCandidate {
    /// The recommended remediation type.
    pub recommendation_type: RecommendationType,
    /// Risk score, 0-10.
    pub risk_level: u8,
    /// Projected annual savings.
    pub projected_annual_savings: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_roundtrip() {
        for t in RecommendationType::ALL {
            let parsed: RecommendationType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("delete-everything".parse::<RecommendationType>().is_err());
    }

    #[test]
    fn type_serde_kebab_case() {
        let json = serde_json::to_string(&RecommendationType::DeleteUnattached).unwrap();
        assert_eq!(json, "\"delete-unattached\"");
    }

    #[test]
    fn deletion_types() {
        assert!(RecommendationType::DeleteUnattached.is_deletion());
        assert!(RecommendationType::SnapshotCleanup.is_deletion());
        assert!(!RecommendationType::Rightsizing.is_deletion());
        assert!(!RecommendationType::LbConsolidation.is_deletion());
    }

    #[test]
    fn pending_transitions() {
        let s = RecommendationStatus::Pending;
        assert!(s.can_transition(RecommendationStatus::Approved));
        assert!(s.can_transition(RecommendationStatus::Rejected));
        assert!(s.can_transition(RecommendationStatus::Executed));
        assert!(s.can_transition(RecommendationStatus::Failed));
    }

    #[test]
    fn approved_transitions() {
        let s = RecommendationStatus::Approved;
        assert!(s.can_transition(RecommendationStatus::Executed));
        assert!(s.can_transition(RecommendationStatus::Failed));
        assert!(!s.can_transition(RecommendationStatus::Pending));
        assert!(!s.can_transition(RecommendationStatus::Rejected));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for terminal in [
            RecommendationStatus::Rejected,
            RecommendationStatus::Executed,
            RecommendationStatus::Failed,
        ] {
            assert!(terminal.is_terminal());
            for to in [
                RecommendationStatus::Pending,
                RecommendationStatus::Approved,
                RecommendationStatus::Rejected,
                RecommendationStatus::Executed,
                RecommendationStatus::Failed,
            ] {
                assert!(!terminal.can_transition(to), "{terminal} -> {to}");
            }
        }
    }

    #[test]
    fn active_states() {
        assert!(RecommendationStatus::Pending.is_active());
        assert!(RecommendationStatus::Approved.is_active());
        assert!(!RecommendationStatus::Executed.is_active());
        assert!(!RecommendationStatus::Rejected.is_active());
        assert!(!RecommendationStatus::Failed.is_active());
    }

    #[test]
    fn priority_from_savings() {
        assert_eq!(Priority::from_monthly_savings(10.0), Priority::Low);
        assert_eq!(Priority::from_monthly_savings(100.0), Priority::Medium);
        assert_eq!(Priority::from_monthly_savings(500.0), Priority::High);
        assert_eq!(Priority::from_monthly_savings(2000.0), Priority::Critical);
    }

    #[test]
    fn recommendation_builder() {
        let rec = Recommendation::new(
            "tenant-1",
            "vol-123",
            ResourceType::BlockVolume,
            RecommendationType::DeleteUnattached,
        )
        .with_risk_level(2)
        .with_projected_savings(640.0)
        .with_execution_mode(ExecutionMode::Autonomous)
        .with_reason("volume is unattached");

        assert_eq!(rec.status, RecommendationStatus::Pending);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.risk_level, 2);
        assert!((rec.projected_annual_savings() - 7680.0).abs() < f64::EPSILON);
    }

    #[test]
    fn candidate_from_recommendation() {
        let rec = Recommendation::new(
            "t",
            "ip-1",
            ResourceType::StaticIp,
            RecommendationType::ReleaseAddress,
        )
        .with_risk_level(2)
        .with_projected_savings(3.6);

        let candidate = rec.as_candidate();
        assert_eq!(
            candidate.recommendation_type,
            RecommendationType::ReleaseAddress
        );
        assert_eq!(candidate.risk_level, 2);
        assert!((candidate.projected_annual_savings - 43.2).abs() < 1e-9);
    }

    #[test]
    fn recommendation_serde_roundtrip() {
        let rec = Recommendation::new(
            "t",
            "i-1",
            ResourceType::ComputeInstance,
            RecommendationType::Rightsizing,
        );
        let json = serde_json::to_string(&rec).unwrap();
        let back: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.status, RecommendationStatus::Pending);
    }
}
