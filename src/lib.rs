//! primeshard - partitioned prime counting
//!
//! Counts the primes in `[2, N]` by splitting the range across worker
//! threads, optionally handing the upper half to a peer process over TCP.
//!
//! # Architecture
//!
//! - **Partitioning**: contiguous, gap-free intervals, one per worker
//! - **Worker pool**: one OS thread per interval, trial division, shared prime set
//! - **Peer link**: fixed-width little-endian integers over a single TCP connection
//! - **Coordinator**: runs the local scan while the peer works, then merges

pub mod config;
pub mod coordinator;
pub mod distributed;
pub mod error;
pub mod logging;
pub mod output;
pub mod partition;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, RunResult};
pub use error::{PrimeError, Result};
pub use partition::{partition, Interval, Partition};
pub use stats::PrimeSet;
