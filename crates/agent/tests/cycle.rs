//! End-to-end pipeline tests with mock collaborators.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use reclaim_agent::{
    Agent, AgentBuilder, AgentError, BreakerConfig, CycleScheduler, SchedulerConfig,
    StaticConfigSource,
};
use reclaim_core::{
    AgentConfig, AgentEventType, ExecutionMode, ExecutionOutcomeKind, RecommendationStatus,
    RecommendationType, ResourceMetrics, ResourceSnapshot, ResourceType,
};
use reclaim_provider::{
    ContextItem, ContextStore, MutationExecutor, MutationOutcome, NotificationEvent, Notifier,
    ProviderError, RawRecommendation, RecommendationProducer, ResourceProvider,
};
use reclaim_state::{HistoryStore, RecommendationStore};
use reclaim_state_memory::MemoryStore;

const TENANT: &str = "tenant-1";

// -- Mock collaborators -------------------------------------------------------

struct FixtureResources {
    snapshots: Vec<ResourceSnapshot>,
    delay: Option<Duration>,
}

impl FixtureResources {
    fn new(snapshots: Vec<ResourceSnapshot>) -> Self {
        Self {
            snapshots,
            delay: None,
        }
    }
}

#[async_trait]
impl ResourceProvider for FixtureResources {
    async fn list_resources(&self, _tenant: &str) -> Result<Vec<ResourceSnapshot>, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.snapshots.clone())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

struct StubMutator {
    fail: bool,
    applied: AtomicU32,
}

impl StubMutator {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            applied: AtomicU32::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            applied: AtomicU32::new(0),
        })
    }
}

impl MutationExecutor for StubMutator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn apply(
        &self,
        _recommendation: &reclaim_core::Recommendation,
    ) -> Result<MutationOutcome, ProviderError> {
        self.applied.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ProviderError::ExecutionFailed("resource is busy".into()))
        } else {
            Ok(MutationOutcome::new(serde_json::json!({"applied": true})).with_savings(12.0))
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ProviderError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FailingContextStore {
    calls: AtomicU32,
}

#[async_trait]
impl ContextStore for FailingContextStore {
    async fn retrieve_context(
        &self,
        _query: &str,
        _k: usize,
    ) -> Result<Vec<ContextItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Connection("vector store unreachable".into()))
    }
}

struct StubProducer {
    proposals: Vec<RawRecommendation>,
}

#[async_trait]
impl RecommendationProducer for StubProducer {
    async fn analyze(
        &self,
        _resources: &[ResourceSnapshot],
    ) -> Result<Vec<RawRecommendation>, ProviderError> {
        Ok(self.proposals.clone())
    }
}

// -- Fixtures -----------------------------------------------------------------

fn unattached_volume(id: &str, monthly_cost: f64) -> ResourceSnapshot {
    ResourceSnapshot::new(id, TENANT, ResourceType::BlockVolume, monthly_cost)
        .with_metrics(ResourceMetrics::Volume {
            attachment_id: None,
            volume_class: Some("gp3".into()),
        })
        .with_config(serde_json::json!({"size_gb": 200}))
}

fn healthy_instance(id: &str) -> ResourceSnapshot {
    ResourceSnapshot::new(id, TENANT, ResourceType::ComputeInstance, 300.0).with_metrics(
        ResourceMetrics::Instance {
            cpu_percent: Some(75.0),
            memory_percent: Some(60.0),
        },
    )
}

fn autonomous_config() -> AgentConfig {
    AgentConfig {
        autonomous_enabled: true,
        max_autonomous_risk: 5,
        approval_ceiling: 1_000_000.0,
        allowed_types: vec![RecommendationType::DeleteUnattached],
    }
}

fn hitl_config() -> AgentConfig {
    AgentConfig {
        autonomous_enabled: false,
        ..autonomous_config()
    }
}

struct Harness {
    agent: Arc<Agent>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    mutator: Arc<StubMutator>,
}

fn harness(
    snapshots: Vec<ResourceSnapshot>,
    config: AgentConfig,
    mutator: Arc<StubMutator>,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let agent = AgentBuilder::new()
        .resources(Arc::new(FixtureResources::new(snapshots)))
        .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
        .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
        .mutation_executor(Arc::clone(&mutator) as _)
        .notifier(Arc::clone(&notifier) as _)
        .config(config)
        .expect("valid test config")
        .rng_seed(7)
        .build()
        .expect("agent should build");
    Harness {
        agent: Arc::new(agent),
        store,
        notifier,
        mutator,
    }
}

// -- Cycle behaviour ----------------------------------------------------------

#[tokio::test]
async fn autonomous_recommendation_executes_and_records() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0), healthy_instance("i-1")],
        autonomous_config(),
        StubMutator::succeeding(),
    );

    let report = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.resources_scanned, 2);
    assert_eq!(report.wasteful_found, 1);
    assert_eq!(report.recommendations_created, 1);
    assert_eq!(report.executed, 1);
    assert_eq!(report.failed, 0);

    let recs = h.store.list(TENANT).await.unwrap();
    assert_eq!(recs.len(), 1);
    let rec = &recs[0];
    assert_eq!(rec.status, RecommendationStatus::Executed);
    assert_eq!(rec.execution_mode, ExecutionMode::Autonomous);
    assert_eq!(rec.recommendation_type, RecommendationType::DeleteUnattached);
    assert_eq!(rec.risk_level, 2);
    // Deletion recovers the full monthly cost.
    assert!((rec.projected_monthly_savings - 80.0).abs() < f64::EPSILON);

    let entries = h.store.for_recommendation(&rec.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, ExecutionOutcomeKind::Executed);
    assert_eq!(entries[0].executed_by, "autonomous-agent");
    assert_eq!(entries[0].actual_monthly_savings, Some(12.0));

    assert_eq!(h.mutator.applied.load(Ordering::SeqCst), 1);
    assert!(
        h.notifier
            .events()
            .iter()
            .any(|e| matches!(e, NotificationEvent::ExecutionCompleted { .. }))
    );
}

#[tokio::test]
async fn hitl_recommendation_stays_pending_and_notifies() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        hitl_config(),
        StubMutator::succeeding(),
    );

    let report = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.recommendations_created, 1);
    assert_eq!(report.hitl_pending, 1);
    assert_eq!(report.executed, 0);

    let recs = h.store.list(TENANT).await.unwrap();
    assert_eq!(recs[0].status, RecommendationStatus::Pending);
    assert_eq!(recs[0].execution_mode, ExecutionMode::Hitl);

    // Nothing executed, nothing in the ledger.
    assert_eq!(h.mutator.applied.load(Ordering::SeqCst), 0);
    assert!(
        h.store
            .for_recommendation(&recs[0].id)
            .await
            .unwrap()
            .is_empty()
    );

    let events = h.notifier.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, NotificationEvent::ApprovalRequested { .. }))
    );
}

#[tokio::test]
async fn second_cycle_deduplicates_active_recommendation() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        hitl_config(),
        StubMutator::succeeding(),
    );

    h.agent.run_cycle(TENANT).await.unwrap();
    let second = h.agent.run_cycle(TENANT).await.unwrap();

    assert_eq!(second.wasteful_found, 1, "still detected as wasteful");
    assert_eq!(second.recommendations_created, 0, "deduped");
    assert_eq!(h.store.list(TENANT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn approval_executes_with_approver_identity() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        hitl_config(),
        StubMutator::succeeding(),
    );
    h.agent.run_cycle(TENANT).await.unwrap();
    let recs = h.store.list(TENANT).await.unwrap();
    let pending = &recs[0];

    let executed = h.agent.approve(&pending.id, "alice").await.unwrap();
    assert_eq!(executed.status, RecommendationStatus::Executed);

    let entries = h.store.for_recommendation(&pending.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].executed_by, "alice");
}

#[tokio::test]
async fn rejection_is_terminal() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        hitl_config(),
        StubMutator::succeeding(),
    );
    h.agent.run_cycle(TENANT).await.unwrap();
    let pending = h.store.list(TENANT).await.unwrap().remove(0);

    let rejected = h.agent.reject(&pending.id, "alice").await.unwrap();
    assert_eq!(rejected.status, RecommendationStatus::Rejected);

    let err = h.agent.approve(&pending.id, "alice").await.unwrap_err();
    assert!(matches!(err, AgentError::State(_)));
    assert_eq!(h.mutator.applied.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_recommendation_is_reported_as_missing() {
    let h = harness(vec![], hitl_config(), StubMutator::succeeding());
    let err = h.agent.approve("no-such-id", "alice").await.unwrap_err();
    assert!(matches!(err, AgentError::RecommendationNotFound(_)));
}

#[tokio::test]
async fn failed_mutation_records_failure_and_allows_retry_cycle() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        autonomous_config(),
        StubMutator::failing(),
    );

    let report = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.failed, 1);

    let recs = h.store.list(TENANT).await.unwrap();
    assert_eq!(recs[0].status, RecommendationStatus::Failed);
    let entries = h.store.for_recommendation(&recs[0].id).await.unwrap();
    assert_eq!(entries[0].outcome, ExecutionOutcomeKind::Failed);
    assert!(entries[0].error.as_deref().unwrap().contains("busy"));

    // The failed record is terminal, so the next cycle may open a fresh
    // recommendation for the same resource.
    let second = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(second.recommendations_created, 1);
    assert_eq!(h.store.list(TENANT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn cost_less_resources_are_skipped() {
    let h = harness(
        vec![
            unattached_volume("vol-free", 0.0),
            unattached_volume("vol-negative", -3.0),
        ],
        autonomous_config(),
        StubMutator::succeeding(),
    );

    let report = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.wasteful_found, 2);
    assert_eq!(report.recommendations_created, 0);
}

#[tokio::test]
async fn batch_size_is_bounded() {
    let snapshots: Vec<ResourceSnapshot> = (0..12)
        .map(|i| unattached_volume(&format!("vol-{i}"), 50.0))
        .collect();
    let h = harness(snapshots, hitl_config(), StubMutator::succeeding());

    let report = h.agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.wasteful_found, 12);
    assert!(
        (2..=5).contains(&report.recommendations_created),
        "batch of {} outside 2-5",
        report.recommendations_created
    );
}

// -- Context store degradation ------------------------------------------------

#[tokio::test]
async fn open_context_breaker_never_fails_the_cycle() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let context = Arc::new(FailingContextStore {
        calls: AtomicU32::new(0),
    });

    let agent = AgentBuilder::new()
        .resources(Arc::new(FixtureResources::new(vec![
            unattached_volume("vol-1", 40.0),
            unattached_volume("vol-2", 40.0),
        ])))
        .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
        .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
        .mutation_executor(StubMutator::succeeding() as _)
        .notifier(Arc::clone(&notifier) as _)
        .context_store(Arc::clone(&context) as _)
        .breaker_config(BreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(3600),
        })
        .config(hitl_config())
        .unwrap()
        .rng_seed(7)
        .build()
        .unwrap();

    let report = agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(report.recommendations_created, 2, "cycle unaffected");

    // The first lookup failed and opened the circuit; the second was
    // short-circuited without reaching the store.
    assert_eq!(context.calls.load(Ordering::SeqCst), 1);
    assert_eq!(agent.metrics().snapshot().context_fallbacks, 1);

    // Both approval requests went out, with empty context.
    let approvals: Vec<_> = notifier
        .events()
        .into_iter()
        .filter_map(|e| match e {
            NotificationEvent::ApprovalRequested { context, .. } => Some(context),
            _ => None,
        })
        .collect();
    assert_eq!(approvals.len(), 2);
    assert!(approvals.iter().all(Vec::is_empty));
}

// -- Producer path ------------------------------------------------------------

#[tokio::test]
async fn producer_output_flows_through_the_state_machine() {
    let store = Arc::new(MemoryStore::new());
    let producer = Arc::new(StubProducer {
        proposals: vec![
            RawRecommendation {
                resource_id: "i-1".into(),
                recommendation_type: RecommendationType::Scheduling,
                reason: "idle outside business hours".into(),
                recommended_config: serde_json::json!({"schedule": "08:00-20:00"}),
            },
            RawRecommendation {
                resource_id: "i-unknown".into(),
                recommendation_type: RecommendationType::Rightsizing,
                reason: "overprovisioned".into(),
                recommended_config: serde_json::Value::Null,
            },
        ],
    });

    let agent = AgentBuilder::new()
        .resources(Arc::new(FixtureResources::new(vec![healthy_instance(
            "i-1",
        )])))
        .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
        .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
        .mutation_executor(StubMutator::succeeding() as _)
        .producer(producer as _)
        .config(autonomous_config())
        .unwrap()
        .rng_seed(7)
        .build()
        .unwrap();

    let created = agent.run_producer_analysis(TENANT).await.unwrap();
    assert_eq!(created.len(), 1, "unknown resource id is skipped");

    let rec = &created[0];
    assert_eq!(rec.recommendation_type, RecommendationType::Scheduling);
    assert_eq!(rec.risk_level, 6);
    // Risk 6 exceeds the allow-list and max risk: HITL despite the toggle.
    assert_eq!(rec.execution_mode, ExecutionMode::Hitl);
    assert_eq!(rec.status, RecommendationStatus::Pending);

    // The dedupe invariant applies to producer output too.
    let again = agent.run_producer_analysis(TENANT).await.unwrap();
    assert!(again.is_empty());
}

// -- Event stream -------------------------------------------------------------

#[tokio::test]
async fn transitions_are_broadcast() {
    let h = harness(
        vec![unattached_volume("vol-1", 80.0)],
        autonomous_config(),
        StubMutator::succeeding(),
    );
    let mut events = h.agent.subscribe();

    h.agent.run_cycle(TENANT).await.unwrap();

    let mut saw_created = false;
    let mut saw_status_change = false;
    let mut saw_recorded = false;
    let mut saw_cycle_completed = false;
    while let Ok(event) = events.try_recv() {
        match event.event_type {
            AgentEventType::RecommendationCreated { status, .. } => {
                assert_eq!(status, RecommendationStatus::Pending);
                saw_created = true;
            }
            AgentEventType::StatusChanged { new_status, .. } => {
                assert_eq!(new_status, RecommendationStatus::Executed);
                saw_status_change = true;
            }
            AgentEventType::ExecutionRecorded { outcome, .. } => {
                assert_eq!(outcome, ExecutionOutcomeKind::Executed);
                saw_recorded = true;
            }
            AgentEventType::CycleCompleted { .. } => saw_cycle_completed = true,
            AgentEventType::CycleSkipped { .. } => {}
        }
        assert_eq!(event.tenant, TENANT);
    }
    assert!(saw_created && saw_status_change && saw_recorded && saw_cycle_completed);
}

// -- Configuration invalidation ----------------------------------------------

#[tokio::test]
async fn config_update_takes_effect_after_invalidation() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(StaticConfigSource::new(autonomous_config()).unwrap());

    let agent = AgentBuilder::new()
        .resources(Arc::new(FixtureResources::new(vec![unattached_volume(
            "vol-1", 80.0,
        )])))
        .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
        .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
        .mutation_executor(StubMutator::succeeding() as _)
        .config_source(Arc::clone(&source) as _)
        .rng_seed(7)
        .build()
        .unwrap();

    let first = agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(first.executed, 1);

    // Administrative update: disable autonomous mode, signal the cache.
    source
        .set(AgentConfig {
            autonomous_enabled: false,
            ..autonomous_config()
        })
        .unwrap();
    agent.config().invalidate();

    // The executed record is terminal, so the same volume is re-flagged;
    // under the new policy it now parks as pending.
    let second = agent.run_cycle(TENANT).await.unwrap();
    assert_eq!(second.recommendations_created, 1);
    assert_eq!(second.hitl_pending, 1);
    assert_eq!(second.executed, 0);
}

// -- Builder validation -------------------------------------------------------

#[test]
fn builder_requires_core_collaborators() {
    let err = AgentBuilder::new().build().unwrap_err();
    assert!(matches!(err, AgentError::Configuration(_)));
    assert!(err.to_string().contains("resource provider"));

    let err = AgentBuilder::new()
        .resources(Arc::new(FixtureResources::new(vec![])))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("recommendation store"));
}

// -- Scheduler ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scheduler_skips_ticks_while_cycle_is_running() {
    let store = Arc::new(MemoryStore::new());
    let mut resources = FixtureResources::new(vec![]);
    resources.delay = Some(Duration::from_millis(250));

    let agent = Arc::new(
        AgentBuilder::new()
            .resources(Arc::new(resources))
            .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
            .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
            .mutation_executor(StubMutator::succeeding() as _)
            .config(hitl_config())
            .unwrap()
            .rng_seed(7)
            .build()
            .unwrap(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
    let scheduler = CycleScheduler::new(
        Arc::clone(&agent),
        SchedulerConfig::new(TENANT).with_interval(Duration::from_millis(100)),
        shutdown_rx,
    );
    let handle = tokio::spawn(scheduler.run());

    // Cycles take 250ms against a 100ms interval: intermediate ticks must
    // be skipped, not queued.
    tokio::time::sleep(Duration::from_millis(550)).await;
    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap();

    let snapshot = agent.metrics().snapshot();
    assert!(snapshot.cycles_completed >= 1, "at least one cycle ran");
    assert!(snapshot.cycles_skipped >= 1, "overlapping ticks skipped");

    // The guard was released: a manual cycle still runs fine.
    agent.run_cycle(TENANT).await.unwrap();
}
