//! Periodic cycle scheduler.
//!
//! A single timer drives the agent. A tick that fires while the previous
//! cycle is still running is skipped outright (no queueing, no overlap), so
//! a slow dependency can never stack unbounded concurrent cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use reclaim_core::{AgentEvent, AgentEventType};
use reclaim_provider::NotificationEvent;

use crate::agent::Agent;

/// Configuration for the cycle scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often a cycle is started (default: 300 seconds).
    pub interval: Duration,
    /// Tenant the scheduler drives cycles for.
    pub tenant: String,
}

impl SchedulerConfig {
    /// Create a configuration with the default interval.
    #[must_use]
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            interval: Duration::from_secs(300),
            tenant: tenant.into(),
        }
    }

    /// Override the cycle interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Releases the reentrancy flag when the cycle task finishes, even if it
/// panics or returns early.
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives [`Agent::run_cycle`] on a fixed interval.
pub struct CycleScheduler {
    agent: Arc<Agent>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    tracker: TaskTracker,
    shutdown_rx: mpsc::Receiver<()>,
}

impl CycleScheduler {
    /// Create a scheduler. Send on the paired channel (or drop the sender)
    /// to stop it.
    pub fn new(
        agent: Arc<Agent>,
        config: SchedulerConfig,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            agent,
            config,
            running: Arc::new(AtomicBool::new(false)),
            tracker: TaskTracker::new(),
            shutdown_rx,
        }
    }

    /// Run until shutdown. In-flight cycles are awaited before returning.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            tenant = %self.config.tenant,
            "starting optimization cycle scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                _ = self.shutdown_rx.recv() => {
                    info!("shutting down cycle scheduler");
                    break;
                }
            }
        }

        // Drain the in-flight cycle, if any, before returning.
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Handle one timer tick, skipping it entirely if a cycle is running.
    fn on_tick(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(tenant = %self.config.tenant, "previous cycle still running, skipping tick");
            self.agent.metrics().increment_cycles_skipped();
            self.agent.emit(AgentEvent::new(
                &self.config.tenant,
                AgentEventType::CycleSkipped {
                    reason: "previous cycle still running".into(),
                },
            ));
            return;
        }

        let agent = Arc::clone(&self.agent);
        let tenant = self.config.tenant.clone();
        let guard = CycleGuard(Arc::clone(&self.running));

        self.tracker.spawn(async move {
            // Moved into the task so the flag is released when the task
            // finishes by any path.
            let _guard = guard;
            if let Err(err) = agent.run_cycle(&tenant).await {
                error!(tenant = %tenant, error = %err, "optimization cycle failed");
                agent
                    .notify(NotificationEvent::CycleFailed {
                        error: err.to_string(),
                    })
                    .await;
            }
        });
    }
}
