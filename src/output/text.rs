//! Human-readable text output

use crate::coordinator::RunResult;
use crate::distributed::SessionReport;
use crate::util::time::{calculate_rate, format_duration, format_rate};
use std::fmt::Write;
use std::time::Duration;

/// Print run results to stdout
pub fn print_results(result: &RunResult) {
    print!("{}", render_results(result));
}

/// Render run results
///
/// The last two lines are always the prime count and the elapsed time.
pub fn render_results(result: &RunResult) -> String {
    let mut out = String::new();
    let elapsed = Duration::from_millis(result.elapsed_millis);

    if let Some(ref peer) = result.peer {
        if peer.recomputed_locally {
            let _ = writeln!(
                out,
                "Peer {} failed; range {} was scanned locally ({} primes).",
                peer.address, peer.span, peer.count
            );
        } else {
            let _ = writeln!(out, "Number of primes received from the peer: {}", peer.count);
        }
    }

    // Integers tested: every value in [2, upper_bound]
    let scanned = (result.upper_bound as i64 - 1).max(0) as u64;
    let _ = writeln!(
        out,
        "Scanned {} integers with {} workers ({} integers/s, {}).",
        scanned,
        result.workers,
        format_rate(calculate_rate(scanned, elapsed)),
        format_duration(elapsed)
    );

    let _ = writeln!(out, "{} primes were found.", result.prime_count);
    let _ = writeln!(out, "Time taken: {} milliseconds.", result.elapsed_millis);
    out
}

/// Print served sessions to stdout
pub fn print_sessions(sessions: &[SessionReport]) {
    print!("{}", render_sessions(sessions));
}

pub fn render_sessions(sessions: &[SessionReport]) -> String {
    let mut out = String::new();
    for session in sessions {
        let _ = writeln!(
            out,
            "Session from {}: scanned {} with {} workers, sent {} primes ({}).",
            session.peer, session.interval, session.workers, session.prime_count, session.state
        );
    }
    let _ = writeln!(out, "{} sessions served.", sessions.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::PeerContribution;
    use crate::distributed::SessionState;
    use crate::partition::Interval;

    fn result(peer: Option<PeerContribution>) -> RunResult {
        RunResult {
            upper_bound: 30,
            workers: 2,
            prime_count: 10,
            local_count: 6,
            peer,
            elapsed_millis: 12,
            primes: vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29],
        }
    }

    #[test]
    fn test_render_standalone() {
        let text = render_results(&result(None));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Scanned 29 integers with 2 workers"));
        assert_eq!(lines[1], "10 primes were found.");
        assert_eq!(lines[2], "Time taken: 12 milliseconds.");
    }

    #[test]
    fn test_render_with_peer() {
        let peer = PeerContribution {
            address: "10.0.0.2:9001".to_string(),
            span: Interval::new(16, 30).unwrap(),
            count: 4,
            recomputed_locally: false,
        };
        let text = render_results(&result(Some(peer.clone())));
        assert!(text.starts_with("Number of primes received from the peer: 4\n"));

        let fallback = PeerContribution {
            recomputed_locally: true,
            ..peer
        };
        let text = render_results(&result(Some(fallback)));
        assert!(text.starts_with("Peer 10.0.0.2:9001 failed; range [16, 30] was scanned locally (4 primes)."));
    }

    #[test]
    fn test_render_sessions() {
        let sessions = vec![SessionReport {
            peer: "127.0.0.1:40000".parse().unwrap(),
            interval: Interval::new(16, 30).unwrap(),
            workers: 2,
            prime_count: 4,
            state: SessionState::Closed,
        }];
        let text = render_sessions(&sessions);
        assert!(text.contains("scanned [16, 30] with 2 workers, sent 4 primes (CLOSED)"));
        assert!(text.ends_with("1 sessions served.\n"));
    }
}
