//! Peer initiator
//!
//! The coordinator's side of the peer link. It connects to a node service,
//! hands over one sub-range, and later collects the primes found there:
//! - Connects (optionally bounded by a connect timeout)
//! - Sends the range request
//! - Waits for the prime report while local workers scan
//! - Validates the report against the range it handed out
//! - Shuts the connection down

use crate::config::PeerConfig;
use crate::distributed::protocol::*;
use crate::error::{PrimeError, Result};
use crate::partition::Interval;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Initiator settings resolved from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerOptions {
    /// Responder address (host:port)
    pub address: String,
    /// Worker hint to send; `None` sends the basic request
    pub worker_hint: Option<u32>,
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
}

impl PeerOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            worker_hint: None,
            connect_timeout: None,
            io_timeout: None,
        }
    }

    /// Resolve options from config; `local_workers` is the default hint
    pub fn from_config(config: &PeerConfig, local_workers: usize) -> Self {
        let worker_hint = config.worker_hint.then(|| {
            config
                .hint_workers
                .unwrap_or_else(|| local_workers.min(u32::MAX as usize) as u32)
        });
        Self {
            address: config.address.clone(),
            worker_hint,
            connect_timeout: config.connect_timeout(),
            io_timeout: config.io_timeout(),
        }
    }

    fn request_for(&self, interval: Interval) -> RangeRequest {
        match self.worker_hint {
            Some(workers) => RangeRequest::with_worker_hint(interval, workers),
            None => RangeRequest::new(interval),
        }
    }
}

/// An open session with a responder that owns one sub-range
pub struct PeerInitiator {
    stream: TcpStream,
    address: String,
    interval: Interval,
    io_timeout: Option<Duration>,
}

impl PeerInitiator {
    /// Connect to the responder and hand it `interval`
    ///
    /// Any failure here is a `ConnectFailure` (or an IO error while sending).
    pub async fn start(options: &PeerOptions, interval: Interval) -> Result<Self> {
        info!(address = %options.address, "Connecting to peer...");
        let mut stream = connect(&options.address, options.connect_timeout).await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        info!(address = %options.address, "Connected to peer");

        let request = options.request_for(interval);
        with_deadline(
            options.io_timeout,
            "sending range request",
            write_range_request(&mut stream, &request),
        )
        .await?;
        info!(%interval, worker_hint = ?request.worker_hint, "Sent range to peer");

        Ok(Self {
            stream,
            address: options.address.clone(),
            interval,
            io_timeout: options.io_timeout,
        })
    }

    /// Range handed to the peer
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Block until the peer's full report arrives, then close the connection
    ///
    /// The report must contain at most one prime per integer in the handed-out
    /// range and nothing outside it.
    pub async fn finish(mut self) -> Result<Vec<i32>> {
        let max_count = usize::try_from(self.interval.len()).unwrap_or(usize::MAX);
        let report = with_deadline(
            self.io_timeout,
            "receiving prime report",
            read_prime_report(&mut self.stream, max_count),
        )
        .await?;
        report.validate(self.interval)?;

        info!(
            address = %self.address,
            primes = report.count(),
            "Received primes from peer"
        );

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Shutdown failed");
        }
        Ok(report.primes)
    }
}

async fn connect(address: &str, limit: Option<Duration>) -> Result<TcpStream> {
    let attempt = async {
        TcpStream::connect(address)
            .await
            .map_err(|source| PrimeError::ConnectFailure {
                addr: address.to_string(),
                source,
            })
    };
    match limit {
        None => attempt.await,
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => Err(PrimeError::ConnectFailure {
                addr: address.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no connection within {:?}", limit),
                ),
            }),
        },
    }
}
