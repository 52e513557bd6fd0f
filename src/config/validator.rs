//! Configuration validation

use super::cli::ExecutionMode;
use super::*;
use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Validate complete configuration for the given mode
pub fn validate_config(config: &Config, mode: ExecutionMode) -> Result<()> {
    match mode {
        ExecutionMode::Standalone => {
            validate_run(&config.run)?;
        }
        ExecutionMode::Coordinator => {
            validate_run(&config.run)?;
            validate_peer(&config.peer)?;
        }
        ExecutionMode::Service => {
            validate_service(&config.service)?;
        }
    }

    Ok(())
}

/// Validate run settings
pub fn validate_run(run: &RunConfig) -> Result<()> {
    if run.max_upper_bound < 2 {
        anyhow::bail!("max_upper_bound must be at least 2, got {}", run.max_upper_bound);
    }

    let upper_bound = run
        .upper_bound
        .context("An upper bound is required (--upper-bound or [run] upper_bound)")?;
    if upper_bound < 2 || upper_bound > run.max_upper_bound {
        anyhow::bail!(
            "upper_bound must be between 2 and {}, got {}",
            run.max_upper_bound,
            upper_bound
        );
    }

    if run.workers == 0 {
        anyhow::bail!("workers must be 1 or more, got {}", run.workers);
    }

    Ok(())
}

/// Validate peer (initiator) settings
pub fn validate_peer(peer: &PeerConfig) -> Result<()> {
    if peer.address.trim().is_empty() {
        anyhow::bail!("Coordinator mode requires a peer address (--peer or [peer] address)");
    }
    if !peer.address.contains(':') {
        anyhow::bail!("Peer address must be host:port, got '{}'", peer.address);
    }
    if peer.hint_workers == Some(0) {
        anyhow::bail!("hint_workers must be 1 or more");
    }
    if peer.connect_timeout_ms == Some(0) || peer.io_timeout_ms == Some(0) {
        anyhow::bail!("Timeouts must be greater than zero when set");
    }

    Ok(())
}

/// Validate service (responder) settings
pub fn validate_service(service: &ServiceConfig) -> Result<()> {
    service
        .listen_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address: {}", service.listen_addr))?;

    if service.workers == Some(0) {
        anyhow::bail!("service workers must be 1 or more");
    }
    if service.io_timeout_ms == Some(0) {
        anyhow::bail!("Timeouts must be greater than zero when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config(upper_bound: Option<i32>, workers: usize) -> Config {
        let mut config = Config::default();
        config.run.upper_bound = upper_bound;
        config.run.workers = workers;
        config
    }

    #[test]
    fn test_valid_standalone() {
        assert!(validate_config(&run_config(Some(30), 3), ExecutionMode::Standalone).is_ok());
        assert!(validate_config(&run_config(Some(2), 1), ExecutionMode::Standalone).is_ok());
        assert!(validate_config(&run_config(Some(10_000_000), 1), ExecutionMode::Standalone).is_ok());
    }

    #[test]
    fn test_missing_upper_bound() {
        let err = validate_config(&run_config(None, 1), ExecutionMode::Standalone).unwrap_err();
        assert!(err.to_string().contains("upper bound is required"));
    }

    #[test]
    fn test_upper_bound_out_of_range() {
        assert!(validate_config(&run_config(Some(1), 1), ExecutionMode::Standalone).is_err());
        assert!(validate_config(&run_config(Some(10_000_001), 1), ExecutionMode::Standalone).is_err());
    }

    #[test]
    fn test_zero_workers() {
        assert!(validate_config(&run_config(Some(30), 0), ExecutionMode::Coordinator).is_err());
    }

    #[test]
    fn test_peer_address_required() {
        let mut config = run_config(Some(30), 2);
        config.peer.address = "nohost".to_string();
        assert!(validate_config(&config, ExecutionMode::Coordinator).is_err());
        // Standalone ignores peer settings
        assert!(validate_config(&config, ExecutionMode::Standalone).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = run_config(Some(30), 2);
        config.peer.io_timeout_ms = Some(0);
        assert!(validate_config(&config, ExecutionMode::Coordinator).is_err());
    }

    #[test]
    fn test_service_listen_addr() {
        let mut config = Config::default();
        assert!(validate_config(&config, ExecutionMode::Service).is_ok());
        config.service.listen_addr = "localhost".to_string();
        assert!(validate_config(&config, ExecutionMode::Service).is_err());
    }

    #[test]
    fn test_service_does_not_need_upper_bound() {
        let config = run_config(None, 4);
        assert!(validate_config(&config, ExecutionMode::Service).is_ok());
    }
}
