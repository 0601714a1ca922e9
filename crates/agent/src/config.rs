//! Cached agent configuration with explicit invalidation.
//!
//! The classification pipeline reads policy many times per cycle; loading it
//! from the source on every read would put the administrative store on the
//! hot path. Instead the cache hands out a shared snapshot and reloads only
//! when an administrative action signals staleness; there is no time-based
//! refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use reclaim_core::AgentConfig;

use crate::error::AgentError;

/// Source of truth for the agent configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load the current configuration.
    async fn load(&self) -> Result<AgentConfig, AgentError>;
}

/// A [`ConfigSource`] holding the configuration in memory.
///
/// The administrative boundary for single-process deployments: `set`
/// validates and stores a new policy, after which callers invalidate the
/// cache so the update takes effect on the next classification.
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    config: RwLock<AgentConfig>,
}

impl StaticConfigSource {
    /// Create a source with a validated initial configuration.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        config.validate().map_err(AgentError::Configuration)?;
        Ok(Self {
            config: RwLock::new(config),
        })
    }

    /// Replace the stored configuration. Invalid values are rejected here,
    /// at the administrative boundary, never inside the pipeline.
    pub fn set(&self, config: AgentConfig) -> Result<(), AgentError> {
        config.validate().map_err(AgentError::Configuration)?;
        *self.config.write() = config;
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<AgentConfig, AgentError> {
        Ok(self.config.read().clone())
    }
}

/// Read-mostly cache over a [`ConfigSource`].
///
/// `current` returns the cached snapshot unless the stale flag is set, in
/// which case it reloads first (copy-on-invalidate; a single writer swaps
/// the `Arc`, readers keep whatever snapshot they already hold).
pub struct ConfigCache {
    source: Arc<dyn ConfigSource>,
    cached: RwLock<Arc<AgentConfig>>,
    stale: AtomicBool,
}

impl ConfigCache {
    /// Create a cache that will load from `source` on first use.
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(Arc::new(AgentConfig::default())),
            stale: AtomicBool::new(true),
        }
    }

    /// Get the current configuration snapshot, reloading if stale.
    ///
    /// A failed reload re-arms the stale flag and surfaces the error; the
    /// previous snapshot is not silently reused for classification.
    pub async fn current(&self) -> Result<Arc<AgentConfig>, AgentError> {
        if self.stale.swap(false, Ordering::SeqCst) {
            match self.source.load().await {
                Ok(config) => {
                    if let Err(msg) = config.validate() {
                        self.stale.store(true, Ordering::SeqCst);
                        return Err(AgentError::Configuration(msg));
                    }
                    *self.cached.write() = Arc::new(config);
                }
                Err(err) => {
                    self.stale.store(true, Ordering::SeqCst);
                    return Err(err);
                }
            }
        }
        Ok(Arc::clone(&self.cached.read()))
    }

    /// Signal that the source changed; the next `current` call reloads.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("stale", &self.stale.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    struct CountingSource {
        inner: StaticConfigSource,
        loads: AtomicU32,
    }

    #[async_trait]
    impl ConfigSource for CountingSource {
        async fn load(&self) -> Result<AgentConfig, AgentError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load().await
        }
    }

    fn counting_source(config: AgentConfig) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            inner: StaticConfigSource::new(config).unwrap(),
            loads: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let source = counting_source(AgentConfig::default());
        let cache = ConfigCache::new(Arc::clone(&source) as Arc<dyn ConfigSource>);

        cache.current().await.unwrap();
        cache.current().await.unwrap();
        cache.current().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        cache.invalidate();
        cache.current().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn update_takes_effect_after_invalidation() {
        let source = counting_source(AgentConfig::default());
        let cache = ConfigCache::new(Arc::clone(&source) as Arc<dyn ConfigSource>);

        let before = cache.current().await.unwrap();
        assert!(!before.autonomous_enabled);

        source
            .inner
            .set(AgentConfig {
                autonomous_enabled: true,
                ..AgentConfig::default()
            })
            .unwrap();

        // Not visible until the invalidation signal arrives.
        let still_cached = cache.current().await.unwrap();
        assert!(!still_cached.autonomous_enabled);

        cache.invalidate();
        let after = cache.current().await.unwrap();
        assert!(after.autonomous_enabled);
    }

    #[tokio::test]
    async fn static_source_rejects_invalid_config() {
        let source = StaticConfigSource::new(AgentConfig::default()).unwrap();
        let err = source
            .set(AgentConfig {
                max_autonomous_risk: 99,
                ..AgentConfig::default()
            })
            .expect_err("invalid config must be rejected at the boundary");
        assert!(matches!(err, AgentError::Configuration(_)));

        assert!(
            StaticConfigSource::new(AgentConfig {
                approval_ceiling: f64::NAN,
                ..AgentConfig::default()
            })
            .is_err()
        );
    }

    #[tokio::test]
    async fn snapshots_are_copy_on_invalidate() {
        let source = counting_source(AgentConfig::default());
        let cache = ConfigCache::new(Arc::clone(&source) as Arc<dyn ConfigSource>);

        let old = cache.current().await.unwrap();
        source
            .inner
            .set(AgentConfig {
                max_autonomous_risk: 7,
                ..AgentConfig::default()
            })
            .unwrap();
        cache.invalidate();
        let new = cache.current().await.unwrap();

        // The old snapshot is unchanged; readers holding it are unaffected.
        assert_eq!(old.max_autonomous_risk, 3);
        assert_eq!(new.max_autonomous_risk, 7);
    }
}
