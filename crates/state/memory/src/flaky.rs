use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use reclaim_core::{
    HistoryPage, HistoryQuery, OptimizationRecord, Recommendation, RecommendationStatus,
};
use reclaim_state::error::StateError;
use reclaim_state::history::HistoryStore;
use reclaim_state::store::RecommendationStore;

/// Store wrapper that injects transient failures for fault-injection tests.
///
/// Each operation can be armed to fail its next N calls with
/// [`StateError::Contention`] before delegating to the wrapped backend. This
/// is how the transactional-executor tests exercise retry behaviour
/// mid-unit-of-work without a real contended database.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    create_failures: AtomicU32,
    transition_failures: AtomicU32,
    complete_failures: AtomicU32,
}

impl<S> FlakyStore<S> {
    /// Wrap a backend with no failures armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            create_failures: AtomicU32::new(0),
            transition_failures: AtomicU32::new(0),
            complete_failures: AtomicU32::new(0),
        }
    }

    /// Arm the next `n` calls to `create` to fail.
    pub fn fail_next_creates(&self, n: u32) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// Arm the next `n` calls to `transition` to fail.
    pub fn fail_next_transitions(&self, n: u32) {
        self.transition_failures.store(n, Ordering::SeqCst);
    }

    /// Arm the next `n` calls to `complete` to fail.
    pub fn fail_next_completes(&self, n: u32) {
        self.complete_failures.store(n, Ordering::SeqCst);
    }

    /// Access the wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn take_failure(counter: &AtomicU32) -> Result<(), StateError> {
        let mut remaining = counter.load(Ordering::SeqCst);
        while remaining > 0 {
            match counter.compare_exchange(
                remaining,
                remaining - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Err(StateError::Contention(
                        "injected serialization conflict".into(),
                    ));
                }
                Err(actual) => remaining = actual,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RecommendationStore> RecommendationStore for FlakyStore<S> {
    async fn create(&self, recommendation: &Recommendation) -> Result<(), StateError> {
        Self::take_failure(&self.create_failures)?;
        self.inner.create(recommendation).await
    }

    async fn get(&self, id: &str) -> Result<Option<Recommendation>, StateError> {
        self.inner.get(id).await
    }

    async fn find_active(
        &self,
        tenant: &str,
        resource_id: &str,
    ) -> Result<Option<Recommendation>, StateError> {
        self.inner.find_active(tenant, resource_id).await
    }

    async fn list(&self, tenant: &str) -> Result<Vec<Recommendation>, StateError> {
        self.inner.list(tenant).await
    }

    async fn transition(
        &self,
        id: &str,
        to: RecommendationStatus,
    ) -> Result<Recommendation, StateError> {
        Self::take_failure(&self.transition_failures)?;
        self.inner.transition(id, to).await
    }

    async fn complete(
        &self,
        id: &str,
        to: RecommendationStatus,
        record: OptimizationRecord,
    ) -> Result<Recommendation, StateError> {
        Self::take_failure(&self.complete_failures)?;
        self.inner.complete(id, to, record).await
    }
}

#[async_trait]
impl<S: HistoryStore> HistoryStore for FlakyStore<S> {
    async fn record(&self, record: OptimizationRecord) -> Result<(), StateError> {
        self.inner.record(record).await
    }

    async fn get(&self, id: &str) -> Result<Option<OptimizationRecord>, StateError> {
        HistoryStore::get(&self.inner, id).await
    }

    async fn for_recommendation(
        &self,
        recommendation_id: &str,
    ) -> Result<Vec<OptimizationRecord>, StateError> {
        self.inner.for_recommendation(recommendation_id).await
    }

    async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage, StateError> {
        self.inner.query(query).await
    }
}

#[cfg(test)]
mod tests {
    use reclaim_core::{RecommendationType, ResourceType};

    use crate::store::MemoryStore;

    use super::*;

    fn rec(resource_id: &str) -> Recommendation {
        Recommendation::new(
            "tenant-1",
            resource_id,
            ResourceType::StaticIp,
            RecommendationType::ReleaseAddress,
        )
    }

    #[tokio::test]
    async fn injected_failures_then_success() {
        let store = FlakyStore::new(MemoryStore::new());
        store.fail_next_creates(2);

        let r = rec("ip-1");
        assert!(matches!(
            store.create(&r).await,
            Err(StateError::Contention(_))
        ));
        assert!(matches!(
            store.create(&r).await,
            Err(StateError::Contention(_))
        ));
        store.create(&r).await.expect("third attempt should pass");
    }

    #[tokio::test]
    async fn complete_failure_leaves_ledger_untouched() {
        let store = FlakyStore::new(MemoryStore::new());
        let r = rec("ip-2");
        store.create(&r).await.unwrap();

        store.fail_next_completes(1);
        let record = OptimizationRecord::failed(&r, "autonomous-agent", "err", 1);
        let err = store
            .complete(&r.id, RecommendationStatus::Failed, record)
            .await
            .expect_err("armed failure");
        assert!(err.is_transient());

        // Neither the status nor the ledger changed.
        let fetched = RecommendationStore::get(&store, &r.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RecommendationStatus::Pending);
        assert!(store.for_recommendation(&r.id).await.unwrap().is_empty());
    }
}
