//! Peer link
//!
//! A run can hand part of its range to one peer process over TCP.
//!
//! # Architecture
//!
//! - **Initiator**: the coordinator side; sends one sub-range, waits for primes
//! - **Node service**: the responder; scans the sub-range and reports back
//!
//! # Modules
//!
//! - `protocol`: wire format (little-endian 32-bit integers) and framing helpers
//! - `initiator`: connect, send range, receive primes
//! - `node_service`: bind with retry, accept, scan, report

pub mod initiator;
pub mod node_service;
pub mod protocol;

pub use initiator::{PeerInitiator, PeerOptions};
pub use node_service::{BoundService, NodeService, ServiceOptions, SessionReport, SessionState};
pub use protocol::{PrimeReport, RangeEncoding, RangeRequest};
