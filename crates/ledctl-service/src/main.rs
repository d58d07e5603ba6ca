//! Display engine daemon (`ledctld`).

use anyhow::{Context, Result};
use clap::Parser;
use ledctl_engine::EngineConfig;
use ledctl_service::{load_registry, Cli, Commands, DaemonConfig, ServiceDaemon};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledctl_service=info,ledctl_engine=info".to_string()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { plugins_dir, config } => run(&plugins_dir, &config).await,
    }
}

async fn run(plugins_dir: &std::path::Path, config_path: &std::path::Path) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting display engine daemon");

    let engine_config = EngineConfig::load(config_path)
        .with_context(|| format!("failed to load engine config from {config_path:?}"))?;

    let registry = load_registry(plugins_dir)
        .with_context(|| format!("failed to load plugins from {plugins_dir:?}"))?;

    let daemon = ServiceDaemon::new(engine_config, config_path.to_path_buf(), DaemonConfig::default());
    daemon.run(registry).await
}
