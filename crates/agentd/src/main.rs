mod config;
mod providers;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use reclaim_agent::{AgentBuilder, CycleScheduler, SchedulerConfig, StaticConfigSource};
use reclaim_state::{HistoryStore, RecommendationStore};
use reclaim_state_memory::MemoryStore;

use crate::config::ReclaimConfig;
use crate::providers::{FileResourceProvider, LogMutationExecutor, LogNotifier};

/// Reclaim optimization agent daemon.
#[derive(Parser, Debug)]
#[command(name = "reclaim-agentd", about = "Standalone Reclaim optimization agent")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "reclaim.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration from the TOML file, or use defaults if absent.
    let config: ReclaimConfig = if Path::new(&cli.config).exists() {
        toml::from_str(&std::fs::read_to_string(&cli.config)?)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        ReclaimConfig::default()
    };

    let policy = config.policy.to_agent_config()?;
    info!(
        tenant = %config.agent.tenant,
        interval_seconds = config.agent.interval_seconds,
        autonomous_enabled = policy.autonomous_enabled,
        "starting reclaim-agentd"
    );

    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(
        AgentBuilder::new()
            .resources(Arc::new(FileResourceProvider::new(
                config.agent.resources_file.as_deref(),
            )))
            .store(Arc::clone(&store) as Arc<dyn RecommendationStore>)
            .history(Arc::clone(&store) as Arc<dyn HistoryStore>)
            .mutation_executor(Arc::new(LogMutationExecutor))
            .notifier(Arc::new(LogNotifier))
            .config_source(Arc::new(StaticConfigSource::new(policy)?))
            .build()?,
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let scheduler = CycleScheduler::new(
        Arc::clone(&agent),
        SchedulerConfig::new(&config.agent.tenant).with_interval(config.agent.interval()),
        shutdown_rx,
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(()).await;
    scheduler_handle.await?;

    let snapshot = agent.metrics().snapshot();
    info!(
        cycles_completed = snapshot.cycles_completed,
        recommendations_created = snapshot.recommendations_created,
        executions_succeeded = snapshot.executions_succeeded,
        "reclaim-agentd stopped"
    );
    Ok(())
}
