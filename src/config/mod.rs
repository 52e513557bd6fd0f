//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Ceiling on the upper bound accepted from a caller
pub const DEFAULT_MAX_UPPER_BOUND: i32 = 10_000_000;

/// Pre-agreed peer port
pub const DEFAULT_PEER_PORT: u16 = 9001;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub peer: PeerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to compute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Scan `[2, upper_bound]`; required for standalone and coordinator runs
    pub upper_bound: Option<i32>,
    /// Local worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Largest accepted upper bound
    #[serde(default = "default_max_upper_bound")]
    pub max_upper_bound: i32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            upper_bound: None,
            workers: default_workers(),
            max_upper_bound: default_max_upper_bound(),
        }
    }
}

/// Initiator side of the peer link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerConfig {
    /// Responder address (host:port)
    #[serde(default = "default_peer_address")]
    pub address: String,
    /// Send the extended `[workers][low][high]` request
    #[serde(default)]
    pub worker_hint: bool,
    /// Worker count sent as the hint; local worker count when unset
    pub hint_workers: Option<u32>,
    /// Connect timeout; blocks indefinitely when unset
    pub connect_timeout_ms: Option<u64>,
    /// Per-transfer timeout; blocks indefinitely when unset
    pub io_timeout_ms: Option<u64>,
    /// Rescan the peer's half locally if the peer fails
    #[serde(default)]
    pub fallback_to_local: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            address: default_peer_address(),
            worker_hint: false,
            hint_workers: None,
            connect_timeout_ms: None,
            io_timeout_ms: None,
            fallback_to_local: false,
        }
    }
}

impl PeerConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

/// Responder (service mode) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Worker threads per session; `run.workers` when unset
    pub workers: Option<usize>,
    /// Expect the extended `[workers][low][high]` request
    #[serde(default)]
    pub worker_hint: bool,
    /// Wait between bind attempts
    #[serde(default = "default_bind_backoff_ms")]
    pub bind_backoff_ms: u64,
    /// Retries after the first failed bind; unbounded when unset
    pub bind_retry_limit: Option<u32>,
    /// Sessions to serve before exiting; 0 serves forever
    #[serde(default = "default_sessions")]
    pub sessions: usize,
    /// Per-transfer timeout; blocks indefinitely when unset
    pub io_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            workers: None,
            worker_hint: false,
            bind_backoff_ms: default_bind_backoff_ms(),
            bind_retry_limit: None,
            sessions: default_sessions(),
            io_timeout_ms: None,
        }
    }
}

impl ServiceConfig {
    pub fn bind_backoff(&self) -> Duration {
        Duration::from_millis(self.bind_backoff_ms)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

/// Report settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Report format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_max_upper_bound() -> i32 {
    DEFAULT_MAX_UPPER_BOUND
}

fn default_peer_address() -> String {
    format!("127.0.0.1:{}", DEFAULT_PEER_PORT)
}

fn default_listen_addr() -> String {
    format!("0.0.0.0:{}", DEFAULT_PEER_PORT)
}

fn default_bind_backoff_ms() -> u64 {
    1000
}

fn default_sessions() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.run.upper_bound, None);
        assert!(config.run.workers >= 1);
        assert_eq!(config.run.max_upper_bound, 10_000_000);
        assert_eq!(config.peer.address, "127.0.0.1:9001");
        assert_eq!(config.peer.connect_timeout(), None);
        assert_eq!(config.service.listen_addr, "0.0.0.0:9001");
        assert_eq!(config.service.bind_backoff(), Duration::from_secs(1));
        assert_eq!(config.service.bind_retry_limit, None);
        assert_eq!(config.service.sessions, 1);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }
}
