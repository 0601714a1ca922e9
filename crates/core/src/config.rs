use serde::{Deserialize, Serialize};

use crate::recommendation::RecommendationType;

/// Runtime policy governing autonomous execution.
///
/// Mutated only through an administrative action; the agent reads it via a
/// cached handle with an explicit invalidation signal, so an update takes
/// effect on the next classification rather than mid-cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Master switch for autonomous execution.
    pub autonomous_enabled: bool,

    /// Highest risk level (0-10) eligible for autonomous execution.
    pub max_autonomous_risk: u8,

    /// Projected *annual* savings above which approval is always required,
    /// regardless of risk.
    pub approval_ceiling: f64,

    /// Recommendation types eligible for autonomous execution.
    pub allowed_types: Vec<RecommendationType>,
}

impl AgentConfig {
    /// Validate configuration values.
    ///
    /// Returns `Err` with a description if any value is invalid:
    /// - `max_autonomous_risk` must be <= 10
    /// - `approval_ceiling` must be finite and >= 0
    pub fn validate(&self) -> Result<(), String> {
        if self.max_autonomous_risk > 10 {
            return Err("max_autonomous_risk must be <= 10".into());
        }
        if !self.approval_ceiling.is_finite() || self.approval_ceiling < 0.0 {
            return Err("approval_ceiling must be a non-negative number".into());
        }
        Ok(())
    }

    /// Whether a recommendation type is on the autonomous allow-list.
    #[must_use]
    pub fn allows_type(&self, t: RecommendationType) -> bool {
        self.allowed_types.contains(&t)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            autonomous_enabled: false,
            max_autonomous_risk: 3,
            approval_ceiling: 5000.0,
            allowed_types: Vec::new(),
        }
    }
}
