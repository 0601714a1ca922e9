//! Projected-savings estimation.
//!
//! Each remediation type has a fixed percentage band; the estimator samples
//! inside the band with an injectable, seedable random source so tests can
//! pin the outcome while production keeps the intended spread.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use reclaim_core::RecommendationType;

/// The `(low, high)` fraction of monthly cost a remediation type recovers.
///
/// Deletion-style remediations recover the full cost; everything else has a
/// band reflecting how aggressive the reconfiguration can be.
#[must_use]
pub fn savings_band(recommendation_type: RecommendationType) -> (f64, f64) {
    match recommendation_type {
        t if t.is_deletion() => (1.0, 1.0),
        RecommendationType::Rightsizing => (0.3, 0.6),
        RecommendationType::Scheduling => (0.5, 0.7),
        RecommendationType::StorageTiering => (0.6, 0.8),
        RecommendationType::VolumeRightsizing | RecommendationType::LambdaRightsizing => {
            (0.2, 0.5)
        }
        RecommendationType::GatewayConsolidation | RecommendationType::LbConsolidation => {
            (0.4, 0.6)
        }
        // All deletion types are covered by the guard above.
        _ => unreachable!("non-deletion type without a band"),
    }
}

/// Samples projected monthly savings for a recommendation.
pub struct SavingsEstimator {
    rng: StdRng,
}

impl SavingsEstimator {
    /// Create an estimator seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic estimator for tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Estimate monthly savings for applying `recommendation_type` to a
    /// resource costing `monthly_cost`.
    ///
    /// The result is always within `monthly_cost * band` and never negative.
    /// Callers skip zero- and negative-cost resources before estimating.
    pub fn estimate(
        &mut self,
        recommendation_type: RecommendationType,
        monthly_cost: f64,
    ) -> f64 {
        let (low, high) = savings_band(recommendation_type);
        let fraction = if (high - low).abs() < f64::EPSILON {
            low
        } else {
            self.rng.gen_range(low..=high)
        };
        (monthly_cost * fraction).max(0.0)
    }
}

impl Default for SavingsEstimator {
    fn default() -> Self {
        Self::new()
    }
}
