//! primeshard CLI entry point

use anyhow::{Context, Result};
use primeshard::config::cli::{Cli, ExecutionMode};
use primeshard::config::{toml::load_config, validator::validate_config, Config};
use primeshard::distributed::{NodeService, PeerOptions, ServiceOptions};
use primeshard::logging::{self, LogConfig};
use primeshard::{output, Coordinator};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init(LogConfig::from_debug_flag(cli.debug).with_env_overrides());

    let config = load_config(&cli)?;
    validate_config(&config, cli.mode).context("Configuration validation failed")?;
    debug!(?config, mode = ?cli.mode, "Configuration loaded");

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    if cli.mode.runs_scan() {
        runtime.block_on(run_scan(&config, cli.mode))
    } else {
        runtime.block_on(run_service(&config))
    }
}

/// Run a scan, with a peer in coordinator mode
async fn run_scan(config: &Config, mode: ExecutionMode) -> Result<()> {
    let upper_bound = config
        .run
        .upper_bound
        .context("An upper bound is required")?;

    let mut coordinator = Coordinator::new(upper_bound, config.run.workers);
    if mode == ExecutionMode::Coordinator {
        coordinator = coordinator
            .with_peer(PeerOptions::from_config(&config.peer, config.run.workers))
            .fallback_to_local(config.peer.fallback_to_local);
    }

    let result = coordinator.run().await.context("Run failed")?;
    output::print_run(&result, config.output.format)
}

/// Serve peer sessions until the configured count is reached
async fn run_service(config: &Config) -> Result<()> {
    let options = ServiceOptions::from_config(&config.service, config.run.workers)
        .context("Invalid service configuration")?;

    let sessions = NodeService::new(options)
        .run()
        .await
        .context("Node service failed")?;
    output::print_sessions(&sessions, config.output.format)
}
