//! Timing utilities
//!
//! Wall-clock measurement for a run and human-readable formatting of the
//! figures that end up in reports.

use std::time::{Duration, Instant};

/// Start point of a measured run
///
/// Thin wrapper around `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    instant: Instant,
}

impl Timestamp {
    /// Create a new timestamp representing the current time
    #[inline]
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
        }
    }

    /// Get the elapsed time since this timestamp
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    /// Get the elapsed time in milliseconds
    #[inline]
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

/// Format a duration with the largest unit that keeps it above one
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use primeshard::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "s"), (1e6, "ms"), (1e3, "us")];

    let nanos = duration.as_nanos() as f64;
    UNITS
        .iter()
        .find(|(scale, _)| nanos >= *scale)
        .map(|(scale, unit)| format!("{:.2}{}", nanos / scale, unit))
        .unwrap_or_else(|| format!("{}ns", duration.as_nanos()))
}

/// Format a per-second rate with a K/M/G suffix
///
/// # Examples
///
/// ```
/// use primeshard::util::time::format_rate;
///
/// assert_eq!(format_rate(500.0), "500");
/// assert_eq!(format_rate(2_500_000.0), "2.50M");
/// ```
pub fn format_rate(rate: f64) -> String {
    const SUFFIXES: [(f64, &str); 3] = [(1e9, "G"), (1e6, "M"), (1e3, "K")];

    SUFFIXES
        .iter()
        .find(|(scale, _)| rate >= *scale)
        .map(|(scale, suffix)| format!("{:.2}{}", rate / scale, suffix))
        .unwrap_or_else(|| format!("{:.0}", rate))
}

/// Items processed per second, 0 for a zero-length duration
pub fn calculate_rate(count: u64, duration: Duration) -> f64 {
    match duration.as_secs_f64() {
        secs if secs > 0.0 => count as f64 / secs,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timestamp_elapsed() {
        let start = Timestamp::now();
        thread::sleep(Duration::from_millis(10));
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert!(start.elapsed_millis() >= 10);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(500.0), "500");
        assert_eq!(format_rate(1500.0), "1.50K");
        assert_eq!(format_rate(1_500_000_000.0), "1.50G");
    }

    #[test]
    fn test_calculate_rate() {
        assert_eq!(calculate_rate(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(calculate_rate(1000, Duration::ZERO), 0.0);
    }
}
