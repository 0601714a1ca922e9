use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use reclaim_core::{
    HistoryPage, HistoryQuery, OptimizationRecord, Recommendation, RecommendationStatus,
};
use reclaim_state::error::StateError;
use reclaim_state::history::HistoryStore;
use reclaim_state::store::RecommendationStore;

/// Internal state shared by both trait implementations.
///
/// Recommendations and the history ledger live behind one mutex so that
/// `create` (dedupe check + insert) and `complete` (status flip + ledger
/// append) are genuinely atomic.
#[derive(Debug, Default)]
struct Inner {
    recommendations: HashMap<String, Recommendation>,
    history: Vec<OptimizationRecord>,
}

/// In-memory [`RecommendationStore`] and [`HistoryStore`] backend.
///
/// The reference backend for tests and single-process deployments. All trait
/// methods complete without awaiting; the async signatures exist for parity
/// with networked backends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn create(&self, recommendation: &Recommendation) -> Result<(), StateError> {
        let mut inner = self.inner.lock();

        let duplicate = inner.recommendations.values().any(|r| {
            r.tenant == recommendation.tenant
                && r.resource_id == recommendation.resource_id
                && r.status.is_active()
        });
        if duplicate {
            return Err(StateError::DuplicateActive {
                resource_id: recommendation.resource_id.clone(),
            });
        }

        inner
            .recommendations
            .insert(recommendation.id.clone(), recommendation.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Recommendation>, StateError> {
        Ok(self.inner.lock().recommendations.get(id).cloned())
    }

    async fn find_active(
        &self,
        tenant: &str,
        resource_id: &str,
    ) -> Result<Option<Recommendation>, StateError> {
        Ok(self
            .inner
            .lock()
            .recommendations
            .values()
            .find(|r| r.tenant == tenant && r.resource_id == resource_id && r.status.is_active())
            .cloned())
    }

    async fn list(&self, tenant: &str) -> Result<Vec<Recommendation>, StateError> {
        let mut records: Vec<Recommendation> = self
            .inner
            .lock()
            .recommendations
            .values()
            .filter(|r| r.tenant == tenant)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn transition(
        &self,
        id: &str,
        to: RecommendationStatus,
    ) -> Result<Recommendation, StateError> {
        let mut inner = self.inner.lock();
        let rec = inner
            .recommendations
            .get_mut(id)
            .ok_or_else(|| StateError::NotFound(id.to_owned()))?;

        if !rec.status.can_transition(to) {
            return Err(StateError::InvalidTransition {
                from: rec.status,
                to,
            });
        }

        rec.status = to;
        rec.updated_at = Utc::now();
        Ok(rec.clone())
    }

    async fn complete(
        &self,
        id: &str,
        to: RecommendationStatus,
        record: OptimizationRecord,
    ) -> Result<Recommendation, StateError> {
        if !matches!(
            to,
            RecommendationStatus::Executed | RecommendationStatus::Failed
        ) {
            return Err(StateError::InvalidTransition {
                from: RecommendationStatus::Pending,
                to,
            });
        }

        // One lock scope covers both writes: the status flip and the ledger
        // append commit together or not at all.
        let mut inner = self.inner.lock();
        let rec = inner
            .recommendations
            .get_mut(id)
            .ok_or_else(|| StateError::NotFound(id.to_owned()))?;

        if !rec.status.can_transition(to) {
            return Err(StateError::InvalidTransition {
                from: rec.status,
                to,
            });
        }

        rec.status = to;
        rec.updated_at = Utc::now();
        let updated = rec.clone();
        inner.history.push(record);
        Ok(updated)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn record(&self, record: OptimizationRecord) -> Result<(), StateError> {
        self.inner.lock().history.push(record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<OptimizationRecord>, StateError> {
        Ok(self
            .inner
            .lock()
            .history
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn for_recommendation(
        &self,
        recommendation_id: &str,
    ) -> Result<Vec<OptimizationRecord>, StateError> {
        Ok(self
            .inner
            .lock()
            .history
            .iter()
            .filter(|r| r.recommendation_id == recommendation_id)
            .cloned()
            .collect())
    }

    async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage, StateError> {
        let inner = self.inner.lock();
        let mut matching: Vec<OptimizationRecord> = inner
            .history
            .iter()
            .filter(|r| {
                query.tenant.as_ref().is_none_or(|t| &r.tenant == t)
                    && query
                        .resource_id
                        .as_ref()
                        .is_none_or(|id| &r.resource_id == id)
                    && query.outcome.is_none_or(|o| r.outcome == o)
                    && query.from.is_none_or(|from| r.executed_at >= from)
                    && query.to.is_none_or(|to| r.executed_at <= to)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));

        let total = matching.len() as u64;
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let records = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(HistoryPage {
            records,
            total,
            limit,
            offset,
        })
    }
}
