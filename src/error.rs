//! Error types for primeshard
//!
//! Every failure in the core is either a fast local fail-stop or a single fatal
//! abort of the run. The only retried condition is the service's bind wait,
//! which surfaces as [`PrimeError::BindRetry`] once a configured limit is hit.

use crate::partition::Interval;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the partition/scan/peer core
#[derive(Error, Debug)]
pub enum PrimeError {
    #[error("Invalid partition request: {reason} (range {low}..={high}, workers {workers})")]
    InvalidPartitionRequest {
        low: i64,
        high: i64,
        workers: usize,
        reason: &'static str,
    },

    #[error("Failed to connect to peer at {addr}: {source}")]
    ConnectFailure {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr} after {attempts} attempts: {source}")]
    BindRetry {
        addr: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Incomplete transfer reading {field}: expected {expected} bytes, got {received}")]
    TransferIncomplete {
        field: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("Worker scanning {interval} failed: {reason}")]
    WorkerFailure { interval: Interval, reason: String },

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Timed out after {elapsed:?} while {operation}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrimeError {
    /// True for failures caused by the peer link rather than local work
    pub fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            PrimeError::ConnectFailure { .. }
                | PrimeError::TransferIncomplete { .. }
                | PrimeError::Protocol(_)
                | PrimeError::Timeout { .. }
                | PrimeError::Io(_)
        )
    }
}

/// Result type used by the library core
pub type Result<T> = std::result::Result<T, PrimeError>;
