//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - scan the whole range on this machine
    Standalone,
    /// Coordinator mode - scan half locally, hand the other half to a peer
    Coordinator,
    /// Service mode - serve peer sessions for a coordinator
    Service,
}

impl ExecutionMode {
    /// Whether this mode computes and reports a run
    pub fn runs_scan(self) -> bool {
        !matches!(self, ExecutionMode::Service)
    }
}

/// Report format on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Text,
    Json,
}

/// primeshard - partitioned prime counting with an optional peer
#[derive(Parser, Debug)]
#[command(name = "primeshard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long, env = "PRIMESHARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Count primes in [2, UPPER_BOUND]
    #[arg(short = 'n', long)]
    pub upper_bound: Option<i32>,

    /// Number of worker threads
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    // === Peer Options (coordinator mode) ===
    /// Peer address to hand half the range to (e.g., "10.0.1.10:9001")
    #[arg(long)]
    pub peer: Option<String>,

    /// Send a worker-count hint ahead of the range (peer must expect it)
    #[arg(long)]
    pub worker_hint: bool,

    /// Worker count to send as the hint (default: --threads)
    #[arg(long)]
    pub hint_workers: Option<u32>,

    /// Connect timeout (e.g., 500ms, 5s); blocks indefinitely if unset
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Per-transfer timeout (e.g., 30s); blocks indefinitely if unset
    #[arg(long)]
    pub io_timeout: Option<String>,

    /// Rescan the peer's half locally if the peer fails
    #[arg(long)]
    pub fallback_local: bool,

    // === Service Options ===
    /// Address for the service to listen on
    #[arg(long)]
    pub listen: Option<String>,

    /// Retries after the first failed bind (default: retry forever)
    #[arg(long)]
    pub bind_retries: Option<u32>,

    /// Wait between bind attempts (e.g., 1s, 250ms)
    #[arg(long)]
    pub bind_backoff: Option<String>,

    /// Sessions to serve before exiting (0 = forever)
    #[arg(long)]
    pub sessions: Option<usize>,

    // === Output Options ===
    /// Report format
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputArg>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
