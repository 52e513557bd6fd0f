//! Range partitioning
//!
//! Splits an inclusive integer interval into contiguous, gap-free,
//! non-overlapping sub-intervals, one per worker.
//!
//! # Layout
//!
//! For an interval of `len` integers and `n` workers, each worker receives
//! `len / n` integers and the last worker additionally absorbs the remainder:
//!
//! ```text
//! [2 ........................................ 30]   len = 29, n = 3, chunk = 9
//! [2 ...... 10][11 ..... 19][20 .......... 30]
//! ```
//!
//! # Peer split
//!
//! When a peer takes half the work, `[2, N]` is cut at `M = max(N / 2, 2)`:
//! the local half is `[2, M]` and the remote half is `[M + 1, N]`. For odd `N`
//! the remote half receives the extra integer. For `N = 2` there is no remote
//! half.

use crate::error::{PrimeError, Result};
use serde::Serialize;
use std::fmt;

/// Smallest integer ever scanned (0 and 1 are not prime)
pub const FIRST_CANDIDATE: i32 = 2;

/// Inclusive integer interval `[low, high]`, never empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    low: i32,
    high: i32,
}

impl Interval {
    /// Create an interval, rejecting `low > high`
    pub fn new(low: i32, high: i32) -> Result<Self> {
        if low > high {
            return Err(PrimeError::InvalidPartitionRequest {
                low: low as i64,
                high: high as i64,
                workers: 0,
                reason: "low bound exceeds high bound",
            });
        }
        Ok(Self { low, high })
    }

    /// The interval `[2, upper_bound]` scanned by a full run
    pub fn up_to(upper_bound: i32) -> Result<Self> {
        if upper_bound < FIRST_CANDIDATE {
            return Err(PrimeError::InvalidPartitionRequest {
                low: FIRST_CANDIDATE as i64,
                high: upper_bound as i64,
                workers: 0,
                reason: "upper bound must be at least 2",
            });
        }
        Ok(Self {
            low: FIRST_CANDIDATE,
            high: upper_bound,
        })
    }

    #[inline]
    pub fn low(&self) -> i32 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> i32 {
        self.high
    }

    /// Number of integers in the interval
    #[inline]
    pub fn len(&self) -> u64 {
        (self.high as i64 - self.low as i64 + 1) as u64
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, n: i32) -> bool {
        self.low <= n && n <= self.high
    }

    /// Every integer in the interval, ascending
    pub fn iter(&self) -> std::ops::RangeInclusive<i32> {
        self.low..=self.high
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Ordered, contiguous, non-overlapping cover of an interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    span: Interval,
    intervals: Vec<Interval>,
}

impl Partition {
    /// The interval this partition covers
    pub fn span(&self) -> Interval {
        self.span
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Split `span` into exactly `workers` contiguous intervals
///
/// Fails with `InvalidPartitionRequest` when `workers` is zero or larger than
/// the number of integers in `span` (an interval is never empty).
pub fn partition(span: Interval, workers: usize) -> Result<Partition> {
    let reject = |reason| PrimeError::InvalidPartitionRequest {
        low: span.low as i64,
        high: span.high as i64,
        workers,
        reason,
    };

    if workers == 0 {
        return Err(reject("worker count must be at least 1"));
    }
    if workers as u64 > span.len() {
        return Err(reject("more workers than integers in range"));
    }

    let chunk = (span.len() / workers as u64) as i64;
    let base = span.low as i64;

    let intervals = (0..workers as i64)
        .map(|i| {
            let low = base + i * chunk;
            let high = if i == workers as i64 - 1 {
                span.high as i64
            } else {
                low + chunk - 1
            };
            Interval {
                low: low as i32,
                high: high as i32,
            }
        })
        .collect();

    Ok(Partition { span, intervals })
}

/// Partition `[2, upper_bound]` across `workers`
pub fn partition_up_to(upper_bound: i32, workers: usize) -> Result<Partition> {
    let span = Interval::up_to(upper_bound).map_err(|e| match e {
        PrimeError::InvalidPartitionRequest { low, high, reason, .. } => {
            PrimeError::InvalidPartitionRequest { low, high, workers, reason }
        }
        other => other,
    })?;
    partition(span, workers)
}

/// Cut `[2, upper_bound]` into a local half and an optional remote half
///
/// Returns `(local, remote)`; `remote` is `None` only when `upper_bound == 2`.
pub fn split_for_peer(upper_bound: i32) -> Result<(Interval, Option<Interval>)> {
    let full = Interval::up_to(upper_bound)?;
    let midpoint = (upper_bound / 2).max(FIRST_CANDIDATE);

    let local = Interval::new(full.low, midpoint)?;
    let remote = if midpoint < full.high {
        Some(Interval::new(midpoint + 1, full.high)?)
    } else {
        None
    };

    Ok((local, remote))
}

/// Cap a requested worker count at the number of integers in `span`
///
/// Zero is passed through so that [`partition`] still rejects it.
pub fn effective_workers(span: Interval, requested: usize) -> usize {
    let cap = usize::try_from(span.len()).unwrap_or(usize::MAX);
    requested.min(cap)
}
