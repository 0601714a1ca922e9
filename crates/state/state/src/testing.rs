//! Backend conformance test suite.
//!
//! Call [`run_store_conformance_tests`] from a backend's test module with a
//! fresh store instance. The suite asserts the contracts every backend must
//! honour: the atomic dedupe guard, the legal-transition table, and the
//! both-or-neither semantics of [`RecommendationStore::complete`].

use reclaim_core::{
    ExecutionOutcomeKind, OptimizationRecord, Recommendation, RecommendationStatus,
    RecommendationType, ResourceType,
};

use crate::error::StateError;
use crate::history::HistoryStore;
use crate::store::RecommendationStore;

fn test_recommendation(resource_id: &str) -> Recommendation {
    Recommendation::new(
        "conformance-tenant",
        resource_id,
        ResourceType::BlockVolume,
        RecommendationType::DeleteUnattached,
    )
    .with_risk_level(2)
    .with_projected_savings(40.0)
}

/// Run the full conformance suite.
///
/// `store` and `history` may be the same object; `complete` must write the
/// ledger entry visible through `history`.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(
    store: &dyn RecommendationStore,
    history: &dyn HistoryStore,
) -> Result<(), StateError> {
    test_create_and_get(store).await?;
    test_duplicate_active_rejected(store).await?;
    test_find_active(store).await?;
    test_legal_transition(store).await?;
    test_illegal_transition(store).await?;
    test_transition_unknown_id(store).await?;
    test_complete_writes_both(store, history).await?;
    test_complete_rejects_non_terminal(store).await?;
    test_new_recommendation_allowed_after_terminal(store, history).await?;
    test_list_by_tenant(store).await?;
    Ok(())
}

async fn test_create_and_get(store: &dyn RecommendationStore) -> Result<(), StateError> {
    let rec = test_recommendation("conf-create");
    store.create(&rec).await?;

    let fetched = store.get(&rec.id).await?;
    let fetched = fetched.expect("created recommendation should be readable");
    assert_eq!(fetched.resource_id, "conf-create");
    assert_eq!(fetched.status, RecommendationStatus::Pending);

    assert!(
        store.get("missing-id").await?.is_none(),
        "get on unknown id should return None"
    );
    Ok(())
}

async fn test_duplicate_active_rejected(
    store: &dyn RecommendationStore,
) -> Result<(), StateError> {
    let first = test_recommendation("conf-dup");
    store.create(&first).await?;

    let second = test_recommendation("conf-dup");
    let err = store
        .create(&second)
        .await
        .expect_err("second active recommendation for the same resource must be rejected");
    assert!(
        matches!(err, StateError::DuplicateActive { ref resource_id } if resource_id == "conf-dup"),
        "expected DuplicateActive, got {err}"
    );
    Ok(())
}

async fn test_find_active(store: &dyn RecommendationStore) -> Result<(), StateError> {
    assert!(
        store
            .find_active("conformance-tenant", "conf-absent")
            .await?
            .is_none(),
        "no active record expected for untouched resource"
    );

    let rec = test_recommendation("conf-active");
    store.create(&rec).await?;

    let active = store
        .find_active("conformance-tenant", "conf-active")
        .await?;
    assert_eq!(active.map(|r| r.id), Some(rec.id));
    Ok(())
}

async fn test_legal_transition(store: &dyn RecommendationStore) -> Result<(), StateError> {
    let rec = test_recommendation("conf-legal");
    store.create(&rec).await?;

    let updated = store
        .transition(&rec.id, RecommendationStatus::Approved)
        .await?;
    assert_eq!(updated.status, RecommendationStatus::Approved);
    assert!(
        updated.updated_at >= rec.updated_at,
        "transition should bump updated_at"
    );
    Ok(())
}

async fn test_illegal_transition(store: &dyn RecommendationStore) -> Result<(), StateError> {
    let rec = test_recommendation("conf-illegal");
    store.create(&rec).await?;
    store
        .transition(&rec.id, RecommendationStatus::Rejected)
        .await?;

    let err = store
        .transition(&rec.id, RecommendationStatus::Approved)
        .await
        .expect_err("rejected is terminal");
    assert!(
        matches!(err, StateError::InvalidTransition { .. }),
        "expected InvalidTransition, got {err}"
    );
    Ok(())
}

async fn test_transition_unknown_id(store: &dyn RecommendationStore) -> Result<(), StateError> {
    let err = store
        .transition("no-such-id", RecommendationStatus::Approved)
        .await
        .expect_err("unknown id should fail");
    assert!(matches!(err, StateError::NotFound(_)));
    Ok(())
}

async fn test_complete_writes_both(
    store: &dyn RecommendationStore,
    history: &dyn HistoryStore,
) -> Result<(), StateError> {
    let rec = test_recommendation("conf-complete");
    store.create(&rec).await?;

    let record = OptimizationRecord::executed(
        &rec,
        "autonomous-agent",
        serde_json::json!({"deleted": true}),
        Some(40.0),
        25,
    );
    let record_id = record.id.clone();

    let updated = store
        .complete(&rec.id, RecommendationStatus::Executed, record)
        .await?;
    assert_eq!(updated.status, RecommendationStatus::Executed);

    let entries = history.for_recommendation(&rec.id).await?;
    assert_eq!(entries.len(), 1, "complete must append exactly one record");
    assert_eq!(entries[0].id, record_id);
    assert_eq!(entries[0].outcome, ExecutionOutcomeKind::Executed);
    Ok(())
}

async fn test_complete_rejects_non_terminal(
    store: &dyn RecommendationStore,
) -> Result<(), StateError> {
    let rec = test_recommendation("conf-nonterminal");
    store.create(&rec).await?;

    let record = OptimizationRecord::failed(&rec, "autonomous-agent", "boom", 10);
    let err = store
        .complete(&rec.id, RecommendationStatus::Approved, record)
        .await
        .expect_err("complete only accepts terminal execution statuses");
    assert!(matches!(err, StateError::InvalidTransition { .. }));
    Ok(())
}

async fn test_new_recommendation_allowed_after_terminal(
    store: &dyn RecommendationStore,
    history: &dyn HistoryStore,
) -> Result<(), StateError> {
    let first = test_recommendation("conf-reopen");
    store.create(&first).await?;

    let record = OptimizationRecord::failed(&first, "autonomous-agent", "mutation failed", 5);
    store
        .complete(&first.id, RecommendationStatus::Failed, record)
        .await?;

    // No active record remains, so a fresh cycle may open a new one.
    let second = test_recommendation("conf-reopen");
    store.create(&second).await?;

    let entries = history.for_recommendation(&first.id).await?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

async fn test_list_by_tenant(store: &dyn RecommendationStore) -> Result<(), StateError> {
    let rec = test_recommendation("conf-list");
    store.create(&rec).await?;

    let listed = store.list("conformance-tenant").await?;
    assert!(
        listed.iter().any(|r| r.id == rec.id),
        "list should include created records"
    );
    assert!(
        store.list("other-tenant").await?.is_empty(),
        "list should be tenant-scoped"
    );
    Ok(())
}
