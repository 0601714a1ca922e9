use std::future::Future;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — calls flow through.
    Closed,
    /// Dependency is failing — calls are rejected immediately.
    Open,
    /// Recovery probe — limited calls are allowed to test dependency health.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration for a circuit breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Number of consecutive successes in `HalfOpen` state to close the circuit.
    pub success_threshold: u32,
    /// How long to wait in `Open` state before allowing a probe.
    pub recovery_timeout: Duration,
}

impl BreakerConfig {
    /// Validate configuration values.
    ///
    /// Returns `Err` with a description if any value is invalid:
    /// - `failure_threshold` must be >= 1
    /// - `success_threshold` must be >= 1
    ///
    /// `recovery_timeout = 0` is intentionally allowed (useful for testing).
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold < 1 {
            return Err("failure_threshold must be >= 1".into());
        }
        if self.success_threshold < 1 {
            return Err("success_threshold must be >= 1".into());
        }
        Ok(())
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Internal mutable state for a circuit breaker.
struct BreakerData {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<Instant>,
    /// Whether a probe call is currently in flight during `HalfOpen` state.
    /// Only one probe is allowed at a time.
    probe_in_flight: bool,
}

impl BreakerData {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_time: None,
            probe_in_flight: false,
        }
    }
}

/// Circuit breaker guarding one unreliable dependency.
///
/// Tracks dependency health and automatically transitions between states:
/// - `Closed` (normal) -> `Open` (failing) when consecutive failures reach the threshold
/// - `Open` -> `HalfOpen` (probing) after the recovery timeout elapses
/// - `HalfOpen` -> `Closed` after consecutive successes reach the threshold
/// - `HalfOpen` -> `Open` on any failure
///
/// Callers that use the guarded dependency for optional enrichment go
/// through [`execute_with_fallback`](Self::execute_with_fallback), which
/// resolves to a fallback value instead of propagating failures.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    data: RwLock<BreakerData>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker named after the dependency it guards.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            data: RwLock::new(BreakerData::new()),
        }
    }

    /// Check whether a call should be allowed through.
    ///
    /// May trigger a transition from `Open` to `HalfOpen` once the recovery
    /// timeout has elapsed; the transitioning call becomes the single probe.
    /// In `HalfOpen` state with a probe already in flight, further calls are
    /// rejected as if the circuit were open.
    ///
    /// Returns `(state, Option<(from, to)>)` where the second element is
    /// `Some` when a state transition occurred.
    pub fn check(&self) -> (CircuitState, Option<(CircuitState, CircuitState)>) {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if data.state == CircuitState::Open
            && let Some(last_failure) = data.last_failure_time
            && last_failure.elapsed() >= self.config.recovery_timeout
        {
            debug!(
                breaker = %self.name,
                "circuit breaker transitioning from open to half-open"
            );
            data.state = CircuitState::HalfOpen;
            data.consecutive_successes = 0;
            data.probe_in_flight = true;
            return (
                CircuitState::HalfOpen,
                Some((CircuitState::Open, CircuitState::HalfOpen)),
            );
        }

        if data.state == CircuitState::HalfOpen && data.probe_in_flight {
            return (CircuitState::Open, None);
        }

        if data.state == CircuitState::HalfOpen {
            data.probe_in_flight = true;
        }

        (data.state, None)
    }

    /// Record a successful call.
    ///
    /// Returns `Some((from, to))` if a state transition occurred.
    pub fn record_success(&self) -> Option<(CircuitState, CircuitState)> {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match data.state {
            CircuitState::HalfOpen => {
                data.consecutive_successes += 1;
                data.probe_in_flight = false;
                if data.consecutive_successes >= self.config.success_threshold {
                    info!(
                        breaker = %self.name,
                        successes = data.consecutive_successes,
                        "circuit breaker closing after successful probes"
                    );
                    data.state = CircuitState::Closed;
                    data.consecutive_failures = 0;
                    data.consecutive_successes = 0;
                    Some((CircuitState::HalfOpen, CircuitState::Closed))
                } else {
                    None
                }
            }
            CircuitState::Closed => {
                data.consecutive_failures = 0;
                None
            }
            CircuitState::Open => None,
        }
    }

    /// Record a failed call.
    ///
    /// Returns `Some((from, to))` if a state transition occurred.
    pub fn record_failure(&self) -> Option<(CircuitState, CircuitState)> {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match data.state {
            CircuitState::Closed => {
                data.consecutive_failures += 1;
                data.last_failure_time = Some(Instant::now());
                if data.consecutive_failures >= self.config.failure_threshold {
                    info!(
                        breaker = %self.name,
                        failures = data.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "circuit breaker opening"
                    );
                    data.state = CircuitState::Open;
                    Some((CircuitState::Closed, CircuitState::Open))
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                info!(
                    breaker = %self.name,
                    "circuit breaker re-opening after half-open probe failure"
                );
                data.state = CircuitState::Open;
                data.last_failure_time = Some(Instant::now());
                data.consecutive_successes = 0;
                data.probe_in_flight = false;
                Some((CircuitState::HalfOpen, CircuitState::Open))
            }
            CircuitState::Open => {
                data.last_failure_time = Some(Instant::now());
                None
            }
        }
    }

    /// Get the current state without triggering transitions.
    pub fn state(&self) -> CircuitState {
        self.data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .state
    }

    /// Get the configuration for this circuit breaker.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Get the name of the guarded dependency.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reset the circuit breaker to `Closed` state.
    pub fn reset(&self) {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *data = BreakerData::new();
    }

    /// Run `op` through the breaker, resolving to `fallback` when the call
    /// cannot or does not succeed.
    ///
    /// On an `Open`-state short-circuit the operation future is dropped
    /// unpolled, so no call reaches the dependency. On an operation error the
    /// failure is recorded and logged as a warning, and `fallback` is
    /// returned; the caller's primary operation never fails because of the
    /// guarded dependency.
    pub async fn execute_with_fallback<T, E, Fut>(&self, fallback: T, op: Fut) -> T
    where
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let (state, _) = self.check();
        if state == CircuitState::Open {
            debug!(breaker = %self.name, "circuit open, using fallback");
            return fallback;
        }

        match op.await {
            Ok(value) => {
                self.record_success();
                value
            }
            Err(err) => {
                warn!(
                    breaker = %self.name,
                    error = %err,
                    "guarded call failed, using fallback"
                );
                self.record_failure();
                fallback
            }
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self
            .data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &data.state)
            .field("consecutive_failures", &data.consecutive_failures)
            .field("consecutive_successes", &data.consecutive_successes)
            .finish_non_exhaustive()
    }
}
