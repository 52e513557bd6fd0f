//! Node service (responder role)
//!
//! The node service runs on the peer machine and serves coordinator sessions:
//! - Binds its listen port, waiting for it to become available
//! - Accepts one connection per session (sessions are never concurrent)
//! - Reads the sub-range to scan
//! - Partitions and scans it with a local worker pool
//! - Sends the primes back and closes the connection
//!
//! # Session Lifecycle
//!
//! ```text
//! LISTENING -> ACCEPTED -> RANGE_RECEIVED -> SCANNING -> RESULT_SENT -> CLOSED
//! ```
//!
//! A session that fails before RESULT_SENT sends nothing back; the connection
//! is shut down and the error is returned.

use crate::config::ServiceConfig;
use crate::distributed::protocol::*;
use crate::error::{PrimeError, Result};
use crate::partition::{effective_workers, partition, Interval};
use crate::stats::PrimeSet;
use crate::worker::spawn_scan;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Responder session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Listening,
    Accepted,
    RangeReceived,
    Scanning,
    ResultSent,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Listening => "LISTENING",
            SessionState::Accepted => "ACCEPTED",
            SessionState::RangeReceived => "RANGE_RECEIVED",
            SessionState::Scanning => "SCANNING",
            SessionState::ResultSent => "RESULT_SENT",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Outcome of one completed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Coordinator address
    pub peer: SocketAddr,
    /// Range that was scanned
    pub interval: Interval,
    /// Workers used for the scan
    pub workers: usize,
    /// Primes sent back
    pub prime_count: usize,
    /// Last state reached
    pub state: SessionState,
}

/// Service settings resolved from configuration
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub listen_addr: SocketAddr,
    pub workers: usize,
    pub encoding: RangeEncoding,
    pub bind_backoff: Duration,
    /// Retries after the first failed bind; `None` retries forever
    pub bind_retry_limit: Option<u32>,
    /// Sessions before exiting; 0 serves forever
    pub sessions: usize,
    pub io_timeout: Option<Duration>,
}

impl ServiceOptions {
    /// Resolve options from config, using `default_workers` when the service
    /// section does not name a worker count
    pub fn from_config(config: &ServiceConfig, default_workers: usize) -> Result<Self> {
        let listen_addr = config.listen_addr.parse::<SocketAddr>().map_err(|e| {
            PrimeError::Protocol(format!("invalid listen address {}: {}", config.listen_addr, e))
        })?;
        Ok(Self {
            listen_addr,
            workers: config.workers.unwrap_or(default_workers).max(1),
            encoding: RangeEncoding::from_hint_flag(config.worker_hint),
            bind_backoff: config.bind_backoff(),
            bind_retry_limit: config.bind_retry_limit,
            sessions: config.sessions,
            io_timeout: config.io_timeout(),
        })
    }
}

/// Node service
///
/// Runs on the peer, accepting work from a coordinator.
pub struct NodeService {
    options: ServiceOptions,

    /// Node identifier (hostname)
    node_id: String,
}

impl NodeService {
    /// Create a new node service
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options,
            node_id: get_node_id(),
        }
    }

    /// Bind and serve the configured number of sessions
    pub async fn run(self) -> Result<Vec<SessionReport>> {
        self.bind().await?.serve().await
    }

    /// Bind the listen address, retrying with a fixed backoff
    ///
    /// Retries forever unless a retry limit is configured, in which case
    /// exhausting it returns `BindRetry`.
    pub async fn bind(self) -> Result<BoundService> {
        let addr = self.options.listen_addr;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match try_bind(addr) {
                Ok(listener) => {
                    let local_addr = listener.local_addr()?;
                    info!(
                        node_id = %self.node_id,
                        %local_addr,
                        state = %SessionState::Listening,
                        "Node service listening"
                    );
                    return Ok(BoundService {
                        listener,
                        options: self.options,
                        node_id: self.node_id,
                    });
                }
                Err(source) => {
                    let exhausted = self
                        .options
                        .bind_retry_limit
                        .map_or(false, |limit| attempts > limit);
                    if exhausted {
                        return Err(PrimeError::BindRetry {
                            addr: addr.to_string(),
                            attempts,
                            source,
                        });
                    }
                    warn!(
                        %addr,
                        attempt = attempts,
                        error = %source,
                        backoff_ms = self.options.bind_backoff.as_millis() as u64,
                        "Bind failed, waiting for port"
                    );
                    sleep(self.options.bind_backoff).await;
                }
            }
        }
    }
}

/// A node service holding a bound listener
pub struct BoundService {
    listener: TcpListener,
    options: ServiceOptions,
    node_id: String,
}

impl BoundService {
    /// Address actually bound (useful when listening on port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve sessions one after another
    ///
    /// In single-session mode a failed session is returned as the error. When
    /// serving several sessions, failures are logged and the service keeps
    /// listening; a failed accept waits `bind_backoff` before the next one.
    pub async fn serve(self) -> Result<Vec<SessionReport>> {
        let single = self.options.sessions == 1;
        let mut reports = Vec::new();
        let mut served = 0usize;

        while self.options.sessions == 0 || served < self.options.sessions {
            info!("Waiting for coordinator connection...");
            let (stream, peer) = accept_with_backoff(
                || self.listener.accept(),
                self.options.bind_backoff,
                !single,
            )
            .await?;

            served += 1;
            match self.run_session(stream, peer).await {
                Ok(report) => reports.push(report),
                Err(e) if single => return Err(e),
                Err(e) => warn!(session = served, error = %e, "Session failed"),
            }
            if self.options.sessions == 0 || served < self.options.sessions {
                info!("Session complete. Waiting for next connection...");
            }
        }

        info!(node_id = %self.node_id, sessions = served, "Node service exiting");
        Ok(reports)
    }

    /// Accept and serve exactly one session
    pub async fn serve_one(&self) -> Result<SessionReport> {
        info!("Waiting for coordinator connection...");
        let (stream, peer) = self.listener.accept().await?;
        self.run_session(stream, peer).await
    }

    async fn run_session(&self, stream: TcpStream, peer: SocketAddr) -> Result<SessionReport> {
        let mut session = Session::new(stream, peer);
        session.advance(SessionState::Accepted);

        match session.exchange(&self.options).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(%peer, state = %session.state, error = %e, "Session aborted");
                session.close().await;
                Err(e)
            }
        }
    }
}

/// Call `accept` until it succeeds, sleeping `backoff` after each failure
///
/// With `retry` off the first failure is returned.
async fn accept_with_backoff<T, F, Fut>(mut accept: F, backoff: Duration, retry: bool) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return Ok(accepted),
            Err(e) if !retry => return Err(e.into()),
            Err(e) => {
                warn!(
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "Accept failed, backing off"
                );
                sleep(backoff).await;
            }
        }
    }
}

/// Per-connection state: the stream, who is on the other end, and where the
/// session is in its lifecycle
struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    state: SessionState,
}

impl Session {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            state: SessionState::Listening,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug!(peer = %self.peer, from = %self.state, to = %next, "Session state");
        self.state = next;
    }

    async fn exchange(&mut self, options: &ServiceOptions) -> Result<SessionReport> {
        info!(peer = %self.peer, "Coordinator connected");

        let request = with_deadline(
            options.io_timeout,
            "reading range request",
            read_range_request(&mut self.stream, options.encoding),
        )
        .await?;
        self.advance(SessionState::RangeReceived);

        let interval = request.interval;
        let requested = request
            .worker_hint
            .map(|w| w as usize)
            .unwrap_or(options.workers);
        let workers = effective_workers(interval, requested);
        info!(%interval, workers, hinted = request.worker_hint.is_some(), "Received range");

        self.advance(SessionState::Scanning);
        let primes = Arc::new(PrimeSet::new());
        let summary = spawn_scan(partition(interval, workers)?, primes.clone()).await?;
        let report = PrimeReport::new(primes.to_sorted_vec());
        info!(
            %interval,
            primes = report.count(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Range scanned"
        );

        with_deadline(
            options.io_timeout,
            "sending prime report",
            write_prime_report(&mut self.stream, &report),
        )
        .await?;
        self.advance(SessionState::ResultSent);

        self.close().await;

        Ok(SessionReport {
            peer: self.peer,
            interval,
            workers,
            prime_count: report.count(),
            state: self.state,
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Shutdown failed");
        }
        self.advance(SessionState::Closed);
    }
}

/// Bind with SO_REUSEADDR and a backlog of one
fn try_bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1)
}

/// Get node identifier (hostname)
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
