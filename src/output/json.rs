//! JSON output formatting
//!
//! Every document carries the time it was produced and the host that
//! produced it, followed by the payload fields.

use crate::coordinator::RunResult;
use crate::distributed::SessionReport;
use anyhow::{Context, Result};
use serde::Serialize;

/// Envelope shared by all JSON reports
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub hostname: String,
    #[serde(flatten)]
    pub body: &'a T,
}

impl<'a, T: Serialize> JsonReport<'a, T> {
    pub fn new(body: &'a T) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionsBody<'a> {
    sessions_served: usize,
    sessions: &'a [SessionReport],
}

/// Serialize a run result
pub fn run_to_json(result: &RunResult) -> Result<String> {
    to_pretty(&JsonReport::new(result))
}

/// Serialize the sessions a node service served
pub fn sessions_to_json(sessions: &[SessionReport]) -> Result<String> {
    let body = SessionsBody {
        sessions_served: sessions.len(),
        sessions,
    };
    to_pretty(&JsonReport::new(&body))
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::PeerContribution;
    use crate::distributed::SessionState;
    use crate::partition::Interval;
    use serde_json::Value;

    #[test]
    fn test_run_json_fields() {
        let result = RunResult {
            upper_bound: 30,
            workers: 2,
            prime_count: 10,
            local_count: 6,
            peer: Some(PeerContribution {
                address: "127.0.0.1:9001".to_string(),
                span: Interval::new(16, 30).unwrap(),
                count: 4,
                recomputed_locally: false,
            }),
            elapsed_millis: 5,
            primes: vec![],
        };
        let json: Value = serde_json::from_str(&run_to_json(&result).unwrap()).unwrap();

        assert_eq!(json["prime_count"], 10);
        assert_eq!(json["local_count"], 6);
        assert_eq!(json["peer"]["count"], 4);
        assert_eq!(json["peer"]["span"]["low"], 16);
        assert_eq!(json["peer"]["span"]["high"], 30);
        assert!(!json["hostname"].as_str().unwrap().is_empty());
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_sessions_json() {
        let sessions = vec![SessionReport {
            peer: "127.0.0.1:40000".parse().unwrap(),
            interval: Interval::new(16, 30).unwrap(),
            workers: 2,
            prime_count: 4,
            state: SessionState::Closed,
        }];
        let json: Value = serde_json::from_str(&sessions_to_json(&sessions).unwrap()).unwrap();
        assert_eq!(json["sessions_served"], 1);
        assert_eq!(json["sessions"][0]["state"], "CLOSED");
        assert_eq!(json["sessions"][0]["peer"], "127.0.0.1:40000");
        assert_eq!(json["sessions"][0]["prime_count"], 4);
    }
}
