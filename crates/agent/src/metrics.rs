use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking agent activity.
///
/// All counters use relaxed ordering for maximum throughput. For a
/// consistent point-in-time view, call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct AgentMetrics {
    /// Optimization cycles that ran to completion.
    pub cycles_completed: AtomicU64,
    /// Ticks skipped because a previous cycle was still running.
    pub cycles_skipped: AtomicU64,
    /// Resource snapshots evaluated by the detector.
    pub resources_scanned: AtomicU64,
    /// Snapshots the detector flagged as wasteful.
    pub wasteful_detected: AtomicU64,
    /// Recommendations admitted into the state machine.
    pub recommendations_created: AtomicU64,
    /// Executions that applied their mutation.
    pub executions_succeeded: AtomicU64,
    /// Executions that failed.
    pub executions_failed: AtomicU64,
    /// Recommendations left pending for human approval.
    pub hitl_pending: AtomicU64,
    /// Context lookups resolved with the breaker fallback.
    pub context_fallbacks: AtomicU64,
    /// Circuit breaker state transitions (any direction).
    pub circuit_transitions: AtomicU64,
}

impl AgentMetrics {
    /// Increment the completed-cycles counter.
    pub fn increment_cycles_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the skipped-cycles counter.
    pub fn increment_cycles_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the scanned-resources counter.
    pub fn add_resources_scanned(&self, count: u64) {
        self.resources_scanned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to the wasteful-detected counter.
    pub fn add_wasteful_detected(&self, count: u64) {
        self.wasteful_detected.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment the recommendations-created counter.
    pub fn increment_recommendations_created(&self) {
        self.recommendations_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the successful-executions counter.
    pub fn increment_executions_succeeded(&self) {
        self.executions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failed-executions counter.
    pub fn increment_executions_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the pending-approval counter.
    pub fn increment_hitl_pending(&self) {
        self.hitl_pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the context-fallback counter.
    pub fn increment_context_fallbacks(&self) {
        self.context_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the circuit-transitions counter.
    pub fn increment_circuit_transitions(&self) {
        self.circuit_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            resources_scanned: self.resources_scanned.load(Ordering::Relaxed),
            wasteful_detected: self.wasteful_detected.load(Ordering::Relaxed),
            recommendations_created: self.recommendations_created.load(Ordering::Relaxed),
            executions_succeeded: self.executions_succeeded.load(Ordering::Relaxed),
            executions_failed: self.executions_failed.load(Ordering::Relaxed),
            hitl_pending: self.hitl_pending.load(Ordering::Relaxed),
            context_fallbacks: self.context_fallbacks.load(Ordering::Relaxed),
            circuit_transitions: self.circuit_transitions.load(Ordering::Relaxed),
        }
    }
}

/// A consistent view of the agent counters for reporting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub resources_scanned: u64,
    pub wasteful_detected: u64,
    pub recommendations_created: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub hitl_pending: u64,
    pub context_fallbacks: u64,
    pub circuit_transitions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = AgentMetrics::default();
        metrics.increment_cycles_completed();
        metrics.increment_cycles_completed();
        metrics.add_resources_scanned(12);
        metrics.increment_executions_failed();

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles_completed, 2);
        assert_eq!(snap.resources_scanned, 12);
        assert_eq!(snap.executions_failed, 1);
        assert_eq!(snap.executions_succeeded, 0);
    }
}
