//! Worker pool
//!
//! Runs one OS thread per [`Interval`] of a [`Partition`]. Each worker tests
//! every integer of its own interval outside any lock and appends each prime it
//! finds to the shared [`PrimeSet`]. Lock contention therefore scales with the
//! density of primes, not with the size of the range scanned.
//!
//! The pool always joins every worker before returning, even when one of them
//! fails, so a caller never observes a scan that is still in progress.

pub mod primality;

pub use primality::{is_prime, PrimalityOracle, TrialDivision};

use crate::error::{PrimeError, Result};
use crate::partition::{Interval, Partition};
use crate::stats::PrimeSet;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Summary of a completed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of workers that ran
    pub workers: usize,
    /// Integers tested across all workers
    pub scanned: u64,
    /// Primes appended to the shared set by this scan
    pub found: usize,
    pub elapsed: Duration,
}

/// Concurrent scanner over a partition
#[derive(Debug, Default, Clone)]
pub struct WorkerPool<O = TrialDivision> {
    oracle: O,
}

impl WorkerPool<TrialDivision> {
    /// Pool using deterministic trial division
    pub fn new() -> Self {
        Self {
            oracle: TrialDivision,
        }
    }
}

impl<O: PrimalityOracle> WorkerPool<O> {
    /// Pool using a custom oracle
    pub fn with_oracle(oracle: O) -> Self {
        Self { oracle }
    }

    /// Scan every interval of `partition` concurrently, appending to `primes`
    ///
    /// Blocks until all workers have finished. If any worker panics, the primes
    /// it already appended stay in `primes` and the first failure is returned
    /// as `WorkerFailure`.
    pub fn run(&self, partition: &Partition, primes: &PrimeSet) -> Result<ScanSummary> {
        let started = Instant::now();
        let oracle = &self.oracle;

        let outcomes: Vec<(Interval, std::result::Result<usize, String>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = partition
                    .iter()
                    .enumerate()
                    .map(|(index, &interval)| {
                        let spawned = std::thread::Builder::new()
                            .name(format!("scan-{index}"))
                            .spawn_scoped(scope, move || scan_interval(oracle, interval, primes));
                        (interval, spawned)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(interval, spawned)| {
                        let outcome = match spawned {
                            Ok(handle) => handle.join().map_err(panic_message),
                            Err(e) => Err(format!("failed to spawn worker thread: {e}")),
                        };
                        (interval, outcome)
                    })
                    .collect()
            });

        let mut found = 0;
        let mut first_failure = None;
        for (interval, outcome) in outcomes {
            match outcome {
                Ok(count) => found += count,
                Err(reason) => {
                    error!(%interval, %reason, "Worker failed");
                    first_failure.get_or_insert(PrimeError::WorkerFailure { interval, reason });
                }
            }
        }
        if let Some(failure) = first_failure {
            return Err(failure);
        }

        let summary = ScanSummary {
            workers: partition.len(),
            scanned: partition.span().len(),
            found,
            elapsed: started.elapsed(),
        };
        debug!(
            span = %partition.span(),
            workers = summary.workers,
            found = summary.found,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Scan complete"
        );
        Ok(summary)
    }
}

impl<O: PrimalityOracle + Clone + 'static> WorkerPool<O> {
    /// Run [`WorkerPool::run`] on tokio's blocking pool
    ///
    /// Lets an async caller overlap the scan with network waits. A join error on
    /// the blocking task is reported as a failure of the whole span.
    pub async fn spawn(&self, partition: Partition, primes: Arc<PrimeSet>) -> Result<ScanSummary> {
        let span = partition.span();
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.run(&partition, &primes))
            .await
            .map_err(|e| PrimeError::WorkerFailure {
                interval: span,
                reason: e.to_string(),
            })?
    }
}

/// Run a trial-division scan on tokio's blocking pool
pub async fn spawn_scan(partition: Partition, primes: Arc<PrimeSet>) -> Result<ScanSummary> {
    WorkerPool::new().spawn(partition, primes).await
}

/// Test every integer in `interval`, appending primes one at a time
fn scan_interval<O: PrimalityOracle + ?Sized>(
    oracle: &O,
    interval: Interval,
    primes: &PrimeSet,
) -> usize {
    debug!(%interval, "Checking range");
    let mut found = 0;
    for n in interval.iter() {
        if oracle.is_prime(n) {
            primes.append(n);
            found += 1;
        }
    }
    debug!(%interval, found, "Range checked");
    found
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker thread panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{partition, partition_up_to};
    use rand::Rng;

    /// Oracle that faults on one specific candidate
    struct FaultyOracle {
        fault_at: i32,
    }

    impl PrimalityOracle for FaultyOracle {
        fn is_prime(&self, n: i32) -> bool {
            if n == self.fault_at {
                panic!("injected fault at {}", n);
            }
            is_prime(n)
        }
    }

    fn sequential(span: Interval) -> Vec<i32> {
        span.iter().filter(|&n| is_prime(n)).collect()
    }

    #[test]
    fn test_scenario_single_worker() {
        let primes = PrimeSet::new();
        let summary = WorkerPool::new()
            .run(&partition_up_to(10, 1).unwrap(), &primes)
            .unwrap();
        assert_eq!(summary.found, 4);
        assert_eq!(summary.scanned, 9);
        assert_eq!(primes.to_sorted_vec(), vec![2, 3, 5, 7]);
    }

    #[test]
    fn test_scenario_three_workers() {
        let primes = PrimeSet::new();
        let summary = WorkerPool::new()
            .run(&partition_up_to(30, 3).unwrap(), &primes)
            .unwrap();
        assert_eq!(summary.workers, 3);
        assert_eq!(primes.len(), 10);
        assert_eq!(
            primes.to_sorted_vec(),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
        );
    }

    #[test]
    fn test_matches_sequential_scan() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let upper = rng.gen_range(2..=20_000);
            let span = Interval::up_to(upper).unwrap();
            let workers = rng.gen_range(1..=32usize).min(span.len() as usize);
            let primes = PrimeSet::new();
            WorkerPool::new()
                .run(&partition(span, workers).unwrap(), &primes)
                .unwrap();
            assert_eq!(primes.to_sorted_vec(), sequential(span), "upper={upper} workers={workers}");
        }
    }

    #[test]
    fn test_no_duplicates_with_many_workers() {
        let primes = PrimeSet::new();
        WorkerPool::new()
            .run(&partition_up_to(5_000, 64).unwrap(), &primes)
            .unwrap();
        let mut sorted = primes.to_sorted_vec();
        let before = sorted.len();
        sorted.dedup();
        assert_eq!(before, sorted.len());
        assert_eq!(before, 669);
    }

    #[test]
    fn test_arbitrary_span() {
        let span = Interval::new(16, 30).unwrap();
        let primes = PrimeSet::new();
        WorkerPool::new().run(&partition(span, 4).unwrap(), &primes).unwrap();
        assert_eq!(primes.to_sorted_vec(), vec![17, 19, 23, 29]);
    }

    #[test]
    fn test_worker_failure_keeps_partial_results() {
        let span = Interval::new(2, 20).unwrap();
        let p = partition(span, 2).unwrap();
        // [2, 10] and [11, 20]; the second worker faults at 15
        let primes = PrimeSet::new();
        let err = WorkerPool::with_oracle(FaultyOracle { fault_at: 15 })
            .run(&p, &primes)
            .unwrap_err();

        match err {
            PrimeError::WorkerFailure { interval, reason } => {
                assert_eq!(interval, Interval::new(11, 20).unwrap());
                assert!(reason.contains("injected fault at 15"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(primes.to_sorted_vec(), vec![2, 3, 5, 7, 11, 13]);
    }
}
