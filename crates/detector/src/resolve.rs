//! Execution-mode resolution.

use reclaim_core::{AgentConfig, ExecutionCandidate, ExecutionMode};

/// Decide whether a candidate may execute autonomously.
///
/// Autonomous execution requires all of: the global toggle enabled, risk at
/// or below the configured maximum, projected annual savings at or below the
/// approval ceiling, and the type on the allow-list. Anything else is
/// human-in-the-loop.
///
/// This is a pure function of its two arguments; it reads no ambient state,
/// so the same `(candidate, config)` pair always resolves the same way.
#[must_use]
pub fn resolve_execution_mode(
    candidate: &ExecutionCandidate,
    config: &AgentConfig,
) -> ExecutionMode {
    let autonomous = config.autonomous_enabled
        && candidate.risk_level <= config.max_autonomous_risk
        && candidate.projected_annual_savings <= config.approval_ceiling
        && config.allows_type(candidate.recommendation_type);

    if autonomous {
        ExecutionMode::Autonomous
    } else {
        ExecutionMode::Hitl
    }
}
