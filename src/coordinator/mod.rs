//! Run coordinator
//!
//! Owns one run end to end: splits `[2, upper_bound]`, hands the upper half to
//! a peer when one is configured, scans the rest locally while the peer works,
//! and merges both contributions into a single [`RunResult`].

use crate::distributed::{PeerInitiator, PeerOptions};
use crate::error::Result;
use crate::partition::{effective_workers, partition, split_for_peer, Interval, Partition};
use crate::stats::PrimeSet;
use crate::util::time::Timestamp;
use crate::worker::{PrimalityOracle, ScanSummary, TrialDivision, WorkerPool};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the peer contributed to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerContribution {
    pub address: String,
    /// Range handed to the peer
    pub span: Interval,
    /// Primes found in `span`
    pub count: usize,
    /// True when the peer failed and `span` was scanned locally instead
    pub recomputed_locally: bool,
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub upper_bound: i32,
    pub workers: usize,
    pub prime_count: usize,
    /// Primes found by local workers in the local span
    pub local_count: usize,
    pub peer: Option<PeerContribution>,
    pub elapsed_millis: u64,
    /// Every prime found, ascending
    #[serde(skip)]
    pub primes: Vec<i32>,
}

/// Coordinator for a single run
#[derive(Debug, Clone)]
pub struct Coordinator<O = TrialDivision> {
    upper_bound: i32,
    workers: usize,
    peer: Option<PeerOptions>,
    fallback_to_local: bool,
    pool: WorkerPool<O>,
}

impl Coordinator<TrialDivision> {
    /// Standalone run over `[2, upper_bound]` with `workers` local threads
    pub fn new(upper_bound: i32, workers: usize) -> Self {
        Self {
            upper_bound,
            workers,
            peer: None,
            fallback_to_local: false,
            pool: WorkerPool::new(),
        }
    }
}

impl<O: PrimalityOracle + Clone + 'static> Coordinator<O> {
    /// Scan locally with a different oracle
    pub fn with_oracle<P: PrimalityOracle + Clone + 'static>(self, oracle: P) -> Coordinator<P> {
        Coordinator {
            upper_bound: self.upper_bound,
            workers: self.workers,
            peer: self.peer,
            fallback_to_local: self.fallback_to_local,
            pool: WorkerPool::with_oracle(oracle),
        }
    }

    /// Hand the upper half of the range to a peer
    pub fn with_peer(mut self, peer: PeerOptions) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Rescan the peer's half locally if the peer fails, instead of aborting
    pub fn fallback_to_local(mut self, enabled: bool) -> Self {
        self.fallback_to_local = enabled;
        self
    }

    /// Execute the run
    ///
    /// Partitioning happens before any thread is started or connection opened,
    /// so an invalid worker count fails without side effects.
    pub async fn run(&self) -> Result<RunResult> {
        let started = Timestamp::now();

        let (local_span, remote_span) = match self.peer {
            Some(_) => split_for_peer(self.upper_bound)?,
            None => (Interval::up_to(self.upper_bound)?, None),
        };
        let local = self.partition_span(local_span)?;

        let remote = match (&self.peer, remote_span) {
            (Some(options), Some(span)) => Some((options, span)),
            (Some(options), None) => {
                warn!(
                    address = %options.address,
                    upper_bound = self.upper_bound,
                    "Nothing left for the peer, running without it"
                );
                None
            }
            (None, _) => None,
        };

        info!(
            upper_bound = self.upper_bound,
            workers = local.len(),
            local = %local_span,
            remote = ?remote.map(|(_, span)| span.to_string()),
            "Starting run"
        );

        let primes = Arc::new(PrimeSet::new());

        let (local_summary, peer) = match remote {
            None => (self.pool.spawn(local, primes.clone()).await?, None),
            Some((options, span)) => self.run_with_peer(local, options, span, &primes).await?,
        };

        let mut primes = Arc::try_unwrap(primes)
            .map(PrimeSet::into_vec)
            .unwrap_or_else(|shared| shared.to_sorted_vec());
        primes.sort_unstable();

        let result = RunResult {
            upper_bound: self.upper_bound,
            workers: local_summary.workers,
            prime_count: primes.len(),
            local_count: local_summary.found,
            peer,
            elapsed_millis: started.elapsed_millis(),
            primes,
        };
        info!(
            primes = result.prime_count,
            elapsed_ms = result.elapsed_millis,
            "Run complete"
        );
        Ok(result)
    }

    async fn run_with_peer(
        &self,
        local: Partition,
        options: &PeerOptions,
        span: Interval,
        primes: &Arc<PrimeSet>,
    ) -> Result<(ScanSummary, Option<PeerContribution>)> {
        // Hand out the remote half before local threads start
        let session = match PeerInitiator::start(options, span).await {
            Ok(session) => Some(session),
            Err(e) if self.fallback_to_local && e.is_peer_failure() => {
                warn!(error = %e, %span, "Peer unavailable, scanning its range locally");
                None
            }
            Err(e) => return Err(e),
        };

        let local_summary = match session {
            Some(session) => {
                let (local_summary, received) =
                    tokio::join!(self.pool.spawn(local, primes.clone()), session.finish());
                let local_summary = local_summary?;
                match received {
                    Ok(remote_primes) => {
                        let count = remote_primes.len();
                        primes.extend(remote_primes);
                        let peer = self.contribution(options, span, count, false);
                        return Ok((local_summary, Some(peer)));
                    }
                    Err(e) if self.fallback_to_local && e.is_peer_failure() => {
                        warn!(error = %e, %span, "Peer failed, scanning its range locally");
                        local_summary
                    }
                    Err(e) => return Err(e),
                }
            }
            None => self.pool.spawn(local, primes.clone()).await?,
        };

        let rescan = self.pool.spawn(self.partition_span(span)?, primes.clone()).await?;
        let peer = self.contribution(options, span, rescan.found, true);
        Ok((local_summary, Some(peer)))
    }

    fn partition_span(&self, span: Interval) -> Result<Partition> {
        let workers = effective_workers(span, self.workers);
        if workers != self.workers {
            debug!(%span, requested = self.workers, workers, "Clamped worker count to range length");
        }
        partition(span, workers)
    }

    fn contribution(
        &self,
        options: &PeerOptions,
        span: Interval,
        count: usize,
        recomputed_locally: bool,
    ) -> PeerContribution {
        PeerContribution {
            address: options.address.clone(),
            span,
            count,
            recomputed_locally,
        }
    }
}
