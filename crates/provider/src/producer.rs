use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reclaim_core::{RecommendationType, ResourceSnapshot};

use crate::error::ProviderError;

/// A recommendation proposed by the generative producer, before risk
/// classification and execution-mode resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecommendation {
    /// The resource the recommendation targets.
    pub resource_id: String,
    /// The proposed remediation.
    pub recommendation_type: RecommendationType,
    /// The producer's explanation.
    pub reason: String,
    /// Proposed configuration after remediation.
    pub recommended_config: serde_json::Value,
}

/// Interface to the generative-AI recommendation producer.
///
/// An alternate source of remediation candidates. Its output flows through
/// the same risk classification, dedupe, and state-machine contract as the
/// heuristic path.
#[async_trait]
pub trait RecommendationProducer: Send + Sync {
    /// Analyze a set of snapshots and propose remediations.
    async fn analyze(
        &self,
        resources: &[ResourceSnapshot],
    ) -> Result<Vec<RawRecommendation>, ProviderError>;
}
