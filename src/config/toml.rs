//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_output_format, parse_duration_ms};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Run settings
    if let Some(upper_bound) = cli.upper_bound {
        config.run.upper_bound = Some(upper_bound);
    }
    if let Some(threads) = cli.threads {
        config.run.workers = threads;
    }

    // Peer settings
    if let Some(ref peer) = cli.peer {
        config.peer.address = peer.clone();
    }
    if cli.worker_hint {
        config.peer.worker_hint = true;
        config.service.worker_hint = true;
    }
    if let Some(hint_workers) = cli.hint_workers {
        config.peer.hint_workers = Some(hint_workers);
    }
    if let Some(ref timeout) = cli.connect_timeout {
        config.peer.connect_timeout_ms =
            Some(parse_duration_ms(timeout).context("Invalid connect timeout")?);
    }
    if let Some(ref timeout) = cli.io_timeout {
        let ms = parse_duration_ms(timeout).context("Invalid IO timeout")?;
        config.peer.io_timeout_ms = Some(ms);
        config.service.io_timeout_ms = Some(ms);
    }
    if cli.fallback_local {
        config.peer.fallback_to_local = true;
    }

    // Service settings
    if let Some(ref listen) = cli.listen {
        config.service.listen_addr = listen.clone();
    }
    if let Some(retries) = cli.bind_retries {
        config.service.bind_retry_limit = Some(retries);
    }
    if let Some(ref backoff) = cli.bind_backoff {
        config.service.bind_backoff_ms =
            parse_duration_ms(backoff).context("Invalid bind backoff")?;
    }
    if let Some(sessions) = cli.sessions {
        config.service.sessions = sessions;
    }
    if let Some(threads) = cli.threads {
        config.service.workers = Some(threads);
    }

    // Output settings
    if let Some(output) = cli.output {
        config.output.format = convert_output_format(output);
    }

    Ok(config)
}

/// Load the optional config file named on the CLI, then apply CLI overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[run]
upper_bound = 30
workers = 3

[peer]
address = "10.0.1.10:9001"
worker_hint = true
connect_timeout_ms = 2000

[service]
bind_retry_limit = 5
sessions = 0

[output]
format = "json"
"#;
        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.run.upper_bound, Some(30));
        assert_eq!(config.run.workers, 3);
        assert_eq!(config.run.max_upper_bound, DEFAULT_MAX_UPPER_BOUND);
        assert_eq!(config.peer.address, "10.0.1.10:9001");
        assert!(config.peer.worker_hint);
        assert_eq!(config.peer.connect_timeout(), Some(Duration::from_secs(2)));
        assert!(!config.peer.fallback_to_local);
        assert_eq!(config.service.bind_retry_limit, Some(5));
        assert_eq!(config.service.sessions, 0);
        assert_eq!(config.service.bind_backoff_ms, 1000);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_toml_rejects_bad_types() {
        assert!(parse_toml_string("[run]\nupper_bound = \"thirty\"\n").is_err());
    }

    #[test]
    fn test_parse_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nupper_bound = 1000\nworkers = 8").unwrap();
        let config = parse_toml_file(file.path()).unwrap();
        assert_eq!(config.run.upper_bound, Some(1000));
        assert_eq!(config.run.workers, 8);
    }

    #[test]
    fn test_parse_toml_file_missing() {
        let err = parse_toml_file(Path::new("/nonexistent/primeshard.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nupper_bound = 1000\nworkers = 8\n[peer]\naddress = \"a:1\"").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "primeshard",
            "--config",
            path.as_str(),
            "-t",
            "2",
            "--io-timeout",
            "3s",
            "--bind-backoff",
            "250ms",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.run.upper_bound, Some(1000));
        assert_eq!(config.run.workers, 2);
        assert_eq!(config.service.workers, Some(2));
        assert_eq!(config.peer.address, "a:1");
        assert_eq!(config.peer.io_timeout_ms, Some(3_000));
        assert_eq!(config.service.io_timeout_ms, Some(3_000));
        assert_eq!(config.service.bind_backoff_ms, 250);
    }

    #[test]
    fn test_invalid_cli_duration() {
        let cli = Cli::try_parse_from(["primeshard", "--connect-timeout", "whenever"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
