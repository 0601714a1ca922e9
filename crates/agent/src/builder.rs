use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;

use reclaim_core::AgentConfig;
use reclaim_detector::SavingsEstimator;
use reclaim_executor::{MutationRunner, RunnerConfig, TransactionConfig};
use reclaim_provider::{
    ContextStore, DynMutationExecutor, Notifier, RecommendationProducer, ResourceProvider,
};
use reclaim_state::{HistoryStore, RecommendationStore};

use crate::agent::{Agent, ContextLookup};
use crate::circuit_breaker::{BreakerConfig, CircuitBreaker};
use crate::config::{ConfigCache, ConfigSource, StaticConfigSource};
use crate::error::AgentError;
use crate::metrics::AgentMetrics;

/// Broadcast channel capacity for the event stream.
const DEFAULT_STREAM_CAPACITY: usize = 256;

/// Fluent builder for constructing an [`Agent`].
///
/// At minimum, a resource provider, a recommendation store, a history store,
/// and a mutation executor must be supplied. Everything else has defaults:
/// no notifier, no context store, no producer, the conservative
/// [`AgentConfig::default`], and entropy-seeded randomness.
pub struct AgentBuilder {
    resources: Option<Arc<dyn ResourceProvider>>,
    store: Option<Arc<dyn RecommendationStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    mutator: Option<Arc<dyn DynMutationExecutor>>,
    notifier: Option<Arc<dyn Notifier>>,
    producer: Option<Arc<dyn RecommendationProducer>>,
    context: Option<Arc<dyn ContextStore>>,
    breaker_config: BreakerConfig,
    config_source: Option<Arc<dyn ConfigSource>>,
    runner_config: RunnerConfig,
    transaction_config: TransactionConfig,
    rng_seed: Option<u64>,
    stream_capacity: usize,
}

impl AgentBuilder {
    /// Create a builder with all optional fields at their defaults.
    pub fn new() -> Self {
        Self {
            resources: None,
            store: None,
            history: None,
            mutator: None,
            notifier: None,
            producer: None,
            context: None,
            breaker_config: BreakerConfig::default(),
            config_source: None,
            runner_config: RunnerConfig::default(),
            transaction_config: TransactionConfig::default(),
            rng_seed: None,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Set the resource ingestion collaborator.
    #[must_use]
    pub fn resources(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(provider);
        self
    }

    /// Set the recommendation store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RecommendationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the history ledger.
    #[must_use]
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the cloud mutation executor.
    #[must_use]
    pub fn mutation_executor(mut self, mutator: Arc<dyn DynMutationExecutor>) -> Self {
        self.mutator = Some(mutator);
        self
    }

    /// Set the notification sender.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the generative recommendation producer.
    #[must_use]
    pub fn producer(mut self, producer: Arc<dyn RecommendationProducer>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Set the vector-context store. Calls are guarded by a circuit breaker
    /// configured via [`breaker_config`](Self::breaker_config).
    #[must_use]
    pub fn context_store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.context = Some(store);
        self
    }

    /// Override the context-store circuit breaker configuration.
    #[must_use]
    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Set the configuration source.
    #[must_use]
    pub fn config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Convenience: serve a fixed [`AgentConfig`] from an in-memory source.
    pub fn config(mut self, config: AgentConfig) -> Result<Self, AgentError> {
        self.config_source = Some(Arc::new(StaticConfigSource::new(config)?));
        Ok(self)
    }

    /// Override the mutation runner configuration.
    #[must_use]
    pub fn runner_config(mut self, config: RunnerConfig) -> Self {
        self.runner_config = config;
        self
    }

    /// Override the transactional retry configuration.
    #[must_use]
    pub fn transaction_config(mut self, config: TransactionConfig) -> Self {
        self.transaction_config = config;
        self
    }

    /// Seed the batch sampler and savings estimator for deterministic tests.
    #[must_use]
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Override the broadcast stream capacity.
    #[must_use]
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// Consume the builder and produce a configured [`Agent`].
    ///
    /// Returns [`AgentError::Configuration`] if a required collaborator is
    /// missing or the breaker configuration is invalid.
    pub fn build(self) -> Result<Agent, AgentError> {
        let resources = self
            .resources
            .ok_or_else(|| AgentError::Configuration("resource provider is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| AgentError::Configuration("recommendation store is required".into()))?;
        let history = self
            .history
            .ok_or_else(|| AgentError::Configuration("history store is required".into()))?;
        let mutator = self
            .mutator
            .ok_or_else(|| AgentError::Configuration("mutation executor is required".into()))?;

        self.breaker_config
            .validate()
            .map_err(AgentError::Configuration)?;

        let context = self.context.map(|store| ContextLookup {
            store,
            breaker: CircuitBreaker::new("context-store", self.breaker_config.clone()),
        });

        let config_source: Arc<dyn ConfigSource> = match self.config_source {
            Some(source) => source,
            None => Arc::new(
                StaticConfigSource::new(AgentConfig::default())
                    .expect("default config is valid"),
            ),
        };

        let (estimator, sampler) = match self.rng_seed {
            Some(seed) => (
                SavingsEstimator::seeded(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (SavingsEstimator::new(), StdRng::from_entropy()),
        };

        let (stream_tx, _) = broadcast::channel(self.stream_capacity);

        Ok(Agent {
            resources,
            store,
            history,
            mutator,
            notifier: self.notifier,
            producer: self.producer,
            context,
            config: ConfigCache::new(config_source),
            estimator: Mutex::new(estimator),
            sampler: Mutex::new(sampler),
            runner: MutationRunner::new(self.runner_config),
            transaction: self.transaction_config,
            stream_tx,
            metrics: Arc::new(AgentMetrics::default()),
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
