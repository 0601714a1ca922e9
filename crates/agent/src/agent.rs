//! The optimization agent pipeline.
//!
//! One cycle: list resource snapshots, detect waste, pick a bounded random
//! batch of candidates, classify each into a recommendation, and either
//! execute it autonomously or park it pending approval. Per-candidate
//! failures are isolated; a broken resource never aborts the rest of the
//! cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use reclaim_core::{
    AgentEvent, AgentEventType, ExecutionMode, OptimizationRecord, Recommendation,
    RecommendationStatus, ResourceSnapshot,
};
use reclaim_detector::{
    SavingsEstimator, WasteVerdict, classify, detect, resolve_execution_mode, risk_of,
};
use reclaim_executor::{MutationResult, MutationRunner, TransactionConfig, with_retry};
use reclaim_provider::{
    ContextItem, ContextStore, DynMutationExecutor, NotificationEvent, Notifier,
    RawRecommendation, RecommendationProducer, ResourceProvider,
};
use reclaim_state::{HistoryStore, RecommendationStore, StateError};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::ConfigCache;
use crate::error::AgentError;
use crate::metrics::AgentMetrics;

/// Smallest per-cycle candidate batch.
const BATCH_MIN: usize = 2;
/// Largest per-cycle candidate batch.
const BATCH_MAX: usize = 5;
/// Context items requested per recommendation.
const CONTEXT_K: usize = 3;

/// Executor identity recorded for autonomous executions.
pub const AUTONOMOUS_EXECUTOR: &str = "autonomous-agent";

/// Summary of one optimization cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleReport {
    /// Snapshots returned by the ingestion collaborator.
    pub resources_scanned: usize,
    /// Snapshots the detector flagged.
    pub wasteful_found: usize,
    /// Recommendations admitted into the state machine this cycle.
    pub recommendations_created: usize,
    /// Recommendations executed successfully this cycle.
    pub executed: usize,
    /// Recommendations whose execution failed this cycle.
    pub failed: usize,
    /// Recommendations left pending for approval this cycle.
    pub hitl_pending: usize,
}

/// The vector-context store together with the breaker that guards it.
pub(crate) struct ContextLookup {
    pub(crate) store: Arc<dyn ContextStore>,
    pub(crate) breaker: CircuitBreaker,
}

/// The optimization agent: composition root for the cycle pipeline.
///
/// Construct via [`AgentBuilder`](crate::AgentBuilder). All collaborators
/// are injected as trait objects so tests can substitute fixtures, and so
/// multiple independent agents can coexist in one process.
pub struct Agent {
    pub(crate) resources: Arc<dyn ResourceProvider>,
    pub(crate) store: Arc<dyn RecommendationStore>,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) mutator: Arc<dyn DynMutationExecutor>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
    pub(crate) producer: Option<Arc<dyn RecommendationProducer>>,
    pub(crate) context: Option<ContextLookup>,
    pub(crate) config: ConfigCache,
    pub(crate) estimator: Mutex<SavingsEstimator>,
    pub(crate) sampler: Mutex<StdRng>,
    pub(crate) runner: MutationRunner,
    pub(crate) transaction: TransactionConfig,
    pub(crate) stream_tx: broadcast::Sender<AgentEvent>,
    pub(crate) metrics: Arc<AgentMetrics>,
}

impl Agent {
    /// Subscribe to the broadcast event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.stream_tx.subscribe()
    }

    /// Agent metrics handle.
    pub fn metrics(&self) -> &Arc<AgentMetrics> {
        &self.metrics
    }

    /// The configuration cache; administrative updates call
    /// [`ConfigCache::invalidate`] through this handle.
    pub fn config(&self) -> &ConfigCache {
        &self.config
    }

    /// The history ledger, for reporting.
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// The recommendation store, for reporting.
    pub fn store(&self) -> &Arc<dyn RecommendationStore> {
        &self.store
    }

    /// Run one optimization cycle for a tenant.
    ///
    /// Failures of individual candidates are logged and skipped; only
    /// cycle-level failures (ingestion, configuration) surface as errors.
    #[instrument(skip(self), fields(%tenant))]
    pub async fn run_cycle(&self, tenant: &str) -> Result<CycleReport, AgentError> {
        let snapshots = self.resources.list_resources(tenant).await?;
        let mut report = CycleReport {
            resources_scanned: snapshots.len(),
            ..CycleReport::default()
        };
        self.metrics.add_resources_scanned(snapshots.len() as u64);

        // Detect waste across the whole fleet.
        let mut wasteful: Vec<(ResourceSnapshot, WasteVerdict)> = Vec::new();
        for snapshot in snapshots {
            let verdict = detect(&snapshot);
            if verdict.wasteful {
                wasteful.push((snapshot, verdict));
            }
        }
        report.wasteful_found = wasteful.len();
        self.metrics.add_wasteful_detected(wasteful.len() as u64);

        // Drop cost-less resources and those already covered by an active
        // recommendation (fast path; the store enforces the invariant again
        // at insert time).
        let mut eligible: Vec<(ResourceSnapshot, WasteVerdict)> = Vec::new();
        for (snapshot, verdict) in wasteful {
            if snapshot.monthly_cost <= 0.0 {
                debug!(resource_id = %snapshot.id, "skipping cost-less resource");
                continue;
            }
            match self.store.find_active(tenant, &snapshot.id).await {
                Ok(Some(_)) => {
                    debug!(resource_id = %snapshot.id, "active recommendation exists, skipping");
                }
                Ok(None) => eligible.push((snapshot, verdict)),
                Err(err) => {
                    warn!(resource_id = %snapshot.id, error = %err, "active lookup failed, skipping resource");
                }
            }
        }

        // Work a bounded random batch per cycle so a large fleet is spread
        // across cycles instead of remediated in one burst.
        let selected = self.sample_batch(eligible);

        for (snapshot, verdict) in selected {
            let resource_id = snapshot.id.clone();
            match self.process_candidate(tenant, snapshot, &verdict).await {
                Ok(Some(recommendation)) => {
                    report.recommendations_created += 1;
                    match recommendation.status {
                        RecommendationStatus::Executed => report.executed += 1,
                        RecommendationStatus::Failed => report.failed += 1,
                        _ => report.hitl_pending += 1,
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        resource_id = %resource_id,
                        error = %err,
                        "candidate processing failed, continuing cycle"
                    );
                }
            }
        }

        self.metrics.increment_cycles_completed();
        self.emit(AgentEvent::new(
            tenant,
            AgentEventType::CycleCompleted {
                resources_scanned: report.resources_scanned,
                wasteful_found: report.wasteful_found,
                recommendations_created: report.recommendations_created,
            },
        ));
        info!(
            resources_scanned = report.resources_scanned,
            wasteful_found = report.wasteful_found,
            recommendations_created = report.recommendations_created,
            executed = report.executed,
            failed = report.failed,
            "optimization cycle complete"
        );
        Ok(report)
    }

    /// Pick 2-5 candidates at random (fewer when fewer are eligible).
    fn sample_batch(
        &self,
        eligible: Vec<(ResourceSnapshot, WasteVerdict)>,
    ) -> Vec<(ResourceSnapshot, WasteVerdict)> {
        let mut rng = self.sampler.lock();
        let batch = rng.gen_range(BATCH_MIN..=BATCH_MAX).min(eligible.len());
        if eligible.len() <= batch {
            return eligible;
        }
        let chosen: HashSet<usize> = index::sample(&mut *rng, eligible.len(), batch)
            .into_iter()
            .collect();
        eligible
            .into_iter()
            .enumerate()
            .filter(|(i, _)| chosen.contains(i))
            .map(|(_, item)| item)
            .collect()
    }

    /// Classify one wasteful snapshot and drive the result into the state
    /// machine. Returns `None` when a concurrent cycle won the dedupe race.
    async fn process_candidate(
        &self,
        tenant: &str,
        snapshot: ResourceSnapshot,
        verdict: &WasteVerdict,
    ) -> Result<Option<Recommendation>, AgentError> {
        let recommendation_type = classify(&snapshot);
        let risk = risk_of(recommendation_type);
        let savings = self
            .estimator
            .lock()
            .estimate(recommendation_type, snapshot.monthly_cost);
        let config = self.config.current().await?;

        let mut recommendation = Recommendation::new(
            tenant,
            &snapshot.id,
            snapshot.resource_type.clone(),
            recommendation_type,
        )
        .with_risk_level(risk)
        .with_projected_savings(savings)
        .with_reason(&verdict.reason)
        .with_configs(snapshot.config.clone(), serde_json::Value::Null);

        let mode = resolve_execution_mode(&recommendation.as_candidate(), &config);
        recommendation = recommendation.with_execution_mode(mode);

        debug!(
            resource_id = %snapshot.id,
            recommendation_type = %recommendation_type,
            risk,
            savings,
            mode = %mode,
            "classified candidate"
        );

        self.admit(recommendation).await
    }

    /// Insert a recommendation and carry out its execution-mode consequence.
    ///
    /// The store's `create` is the authoritative dedupe guard; losing that
    /// race is an expected outcome, not an error.
    async fn admit(
        &self,
        recommendation: Recommendation,
    ) -> Result<Option<Recommendation>, AgentError> {
        match self.store.create(&recommendation).await {
            Ok(()) => {}
            Err(StateError::DuplicateActive { resource_id }) => {
                debug!(%resource_id, "lost dedupe race, skipping");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }

        self.metrics.increment_recommendations_created();
        self.emit(AgentEvent::new(
            &recommendation.tenant,
            AgentEventType::RecommendationCreated {
                recommendation_id: recommendation.id.clone(),
                resource_id: recommendation.resource_id.clone(),
                status: recommendation.status,
                execution_mode: recommendation.execution_mode,
            },
        ));

        match recommendation.execution_mode {
            ExecutionMode::Autonomous => {
                let executed = self
                    .execute_recommendation(&recommendation, AUTONOMOUS_EXECUTOR)
                    .await?;
                Ok(Some(executed))
            }
            ExecutionMode::Hitl => {
                self.metrics.increment_hitl_pending();
                let context = self.retrieve_context(&recommendation).await;
                self.notify(NotificationEvent::ApprovalRequested {
                    recommendation: recommendation.clone(),
                    context,
                })
                .await;
                Ok(Some(recommendation))
            }
        }
    }

    /// Apply the cloud mutation and commit the outcome.
    ///
    /// The status flip and history append go through the transactional
    /// executor as one retried unit of work, so transient store contention
    /// cannot split the pair.
    async fn execute_recommendation(
        &self,
        recommendation: &Recommendation,
        executed_by: &str,
    ) -> Result<Recommendation, AgentError> {
        let started = Instant::now();
        let result = self.runner.run(recommendation, self.mutator.as_ref()).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let previous_status = recommendation.status;
        let (final_status, record) = match result {
            MutationResult::Applied(outcome) => (
                RecommendationStatus::Executed,
                OptimizationRecord::executed(
                    recommendation,
                    executed_by,
                    outcome.applied_config,
                    outcome.actual_monthly_savings,
                    duration_ms,
                ),
            ),
            MutationResult::Failed(failure) => (
                RecommendationStatus::Failed,
                OptimizationRecord::failed(
                    recommendation,
                    executed_by,
                    &failure.message,
                    duration_ms,
                ),
            ),
        };
        let record_id = record.id.clone();
        let outcome_kind = record.outcome;

        let updated = with_retry(&self.transaction, || {
            self.store
                .complete(&recommendation.id, final_status, record.clone())
        })
        .await?;

        match final_status {
            RecommendationStatus::Executed => self.metrics.increment_executions_succeeded(),
            _ => self.metrics.increment_executions_failed(),
        }

        self.emit(AgentEvent::new(
            &updated.tenant,
            AgentEventType::StatusChanged {
                recommendation_id: updated.id.clone(),
                resource_id: updated.resource_id.clone(),
                previous_status,
                new_status: final_status,
            },
        ));
        self.emit(AgentEvent::new(
            &updated.tenant,
            AgentEventType::ExecutionRecorded {
                recommendation_id: updated.id.clone(),
                record_id,
                outcome: outcome_kind,
            },
        ));
        self.notify(NotificationEvent::ExecutionCompleted {
            recommendation_id: updated.id.clone(),
            outcome: outcome_kind,
        })
        .await;

        Ok(updated)
    }

    /// Approve a pending recommendation and execute it immediately.
    ///
    /// The approval heritage carries through: entering `approved` triggers
    /// execution rather than waiting for another cycle.
    #[instrument(skip(self), fields(%id, %approved_by))]
    pub async fn approve(
        &self,
        id: &str,
        approved_by: &str,
    ) -> Result<Recommendation, AgentError> {
        let approved = self
            .store
            .transition(id, RecommendationStatus::Approved)
            .await
            .map_err(|err| match err {
                StateError::NotFound(id) => AgentError::RecommendationNotFound(id),
                other => other.into(),
            })?;

        self.emit(AgentEvent::new(
            &approved.tenant,
            AgentEventType::StatusChanged {
                recommendation_id: approved.id.clone(),
                resource_id: approved.resource_id.clone(),
                previous_status: RecommendationStatus::Pending,
                new_status: RecommendationStatus::Approved,
            },
        ));

        self.execute_recommendation(&approved, approved_by).await
    }

    /// Reject a pending recommendation.
    #[instrument(skip(self), fields(%id, %rejected_by))]
    pub async fn reject(
        &self,
        id: &str,
        rejected_by: &str,
    ) -> Result<Recommendation, AgentError> {
        let rejected = self
            .store
            .transition(id, RecommendationStatus::Rejected)
            .await
            .map_err(|err| match err {
                StateError::NotFound(id) => AgentError::RecommendationNotFound(id),
                other => other.into(),
            })?;

        info!(recommendation_id = %rejected.id, rejected_by, "recommendation rejected");
        self.emit(AgentEvent::new(
            &rejected.tenant,
            AgentEventType::StatusChanged {
                recommendation_id: rejected.id.clone(),
                resource_id: rejected.resource_id.clone(),
                previous_status: RecommendationStatus::Pending,
                new_status: RecommendationStatus::Rejected,
            },
        ));
        Ok(rejected)
    }

    /// Run the generative producer over the current fleet and ingest its
    /// proposals through the standard pipeline.
    #[instrument(skip(self), fields(%tenant))]
    pub async fn run_producer_analysis(
        &self,
        tenant: &str,
    ) -> Result<Vec<Recommendation>, AgentError> {
        let Some(producer) = &self.producer else {
            return Err(AgentError::Configuration(
                "no recommendation producer configured".into(),
            ));
        };
        let snapshots = self.resources.list_resources(tenant).await?;
        let raw = producer.analyze(&snapshots).await?;
        self.ingest_raw(tenant, &snapshots, raw).await
    }

    /// Drive producer output through risk classification, dedupe, and the
    /// state machine, the same contract as the heuristic path.
    pub async fn ingest_raw(
        &self,
        tenant: &str,
        snapshots: &[ResourceSnapshot],
        raw: Vec<RawRecommendation>,
    ) -> Result<Vec<Recommendation>, AgentError> {
        let config = self.config.current().await?;
        let mut admitted = Vec::new();

        for item in raw {
            let Some(snapshot) = snapshots.iter().find(|s| s.id == item.resource_id) else {
                warn!(resource_id = %item.resource_id, "producer referenced unknown resource, skipping");
                continue;
            };
            if snapshot.monthly_cost <= 0.0 {
                debug!(resource_id = %snapshot.id, "skipping cost-less resource");
                continue;
            }

            let risk = risk_of(item.recommendation_type);
            let savings = self
                .estimator
                .lock()
                .estimate(item.recommendation_type, snapshot.monthly_cost);

            let mut recommendation = Recommendation::new(
                tenant,
                &snapshot.id,
                snapshot.resource_type.clone(),
                item.recommendation_type,
            )
            .with_risk_level(risk)
            .with_projected_savings(savings)
            .with_reason(item.reason)
            .with_configs(snapshot.config.clone(), item.recommended_config);

            let mode = resolve_execution_mode(&recommendation.as_candidate(), &config);
            recommendation = recommendation.with_execution_mode(mode);

            match self.admit(recommendation).await {
                Ok(Some(rec)) => admitted.push(rec),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        resource_id = %snapshot.id,
                        error = %err,
                        "producer candidate failed, continuing"
                    );
                }
            }
        }

        Ok(admitted)
    }

    /// Look up similar past optimizations through the circuit breaker.
    ///
    /// The context store is non-critical: an open circuit or a failed lookup
    /// resolves to no context, never to a pipeline error.
    async fn retrieve_context(&self, recommendation: &Recommendation) -> Vec<ContextItem> {
        let Some(lookup) = &self.context else {
            return Vec::new();
        };

        let query = format!(
            "{} {}",
            recommendation.recommendation_type, recommendation.resource_type
        );
        let state_before = lookup.breaker.state();
        let attempted = AtomicBool::new(false);
        let items = lookup
            .breaker
            .execute_with_fallback(Vec::new(), async {
                attempted.store(true, Ordering::SeqCst);
                lookup.store.retrieve_context(&query, CONTEXT_K).await
            })
            .await;

        if lookup.breaker.state() != state_before {
            self.metrics.increment_circuit_transitions();
        }
        if !attempted.load(Ordering::SeqCst) {
            // Short-circuited by an open breaker.
            self.metrics.increment_context_fallbacks();
        }
        items
    }

    /// Broadcast an event (fire-and-forget; no-op without subscribers).
    pub(crate) fn emit(&self, event: AgentEvent) {
        let _ = self.stream_tx.send(event);
    }

    /// Send a notification, logging failures instead of propagating them.
    pub(crate) async fn notify(&self, event: NotificationEvent) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.notify(&event).await {
                warn!(error = %err, "notification failed");
            }
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
