//! CLI to Config conversion utilities

use crate::config::cli::OutputArg;
use crate::config::OutputFormat;
use anyhow::{Context, Result};

/// Parse a time string (e.g., "250ms", "5s", "2m") to milliseconds
///
/// A bare number is taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1u64)
    } else if s.ends_with("min") || s.ends_with('m') {
        (s.trim_end_matches("min").trim_end_matches('m'), 60_000)
    } else if s.ends_with("sec") || s.ends_with('s') {
        (s.trim_end_matches("sec").trim_end_matches('s'), 1_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Convert CLI output argument to config output format
pub fn convert_output_format(arg: OutputArg) -> OutputFormat {
    match arg {
        OutputArg::Text => OutputFormat::Text,
        OutputArg::Json => OutputFormat::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms("250ms").unwrap(), 250);
        assert_eq!(parse_duration_ms("5s").unwrap(), 5_000);
        assert_eq!(parse_duration_ms("5sec").unwrap(), 5_000);
        assert_eq!(parse_duration_ms("2m").unwrap(), 120_000);
        assert_eq!(parse_duration_ms("1min").unwrap(), 60_000);
        assert_eq!(parse_duration_ms("1500").unwrap(), 1_500);
        assert_eq!(parse_duration_ms(" 1S ").unwrap(), 1_000);
    }

    #[test]
    fn test_parse_duration_ms_invalid() {
        assert!(parse_duration_ms("soon").is_err());
        assert!(parse_duration_ms("-5s").is_err());
        assert!(parse_duration_ms("").is_err());
    }

    #[test]
    fn test_convert_output_format() {
        assert_eq!(convert_output_format(OutputArg::Json), OutputFormat::Json);
        assert_eq!(convert_output_format(OutputArg::Text), OutputFormat::Text);
    }
}
