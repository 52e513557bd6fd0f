//! Result reporting
//!
//! - `text`: human-readable report
//! - `json`: machine-readable report

pub mod json;
pub mod text;

use crate::config::OutputFormat;
use crate::coordinator::RunResult;
use crate::distributed::SessionReport;
use anyhow::Result;

/// Print a run result to stdout in the configured format
pub fn print_run(result: &RunResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => text::print_results(result),
        OutputFormat::Json => println!("{}", json::run_to_json(result)?),
    }
    Ok(())
}

/// Print the sessions a node service served
pub fn print_sessions(sessions: &[SessionReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => text::print_sessions(sessions),
        OutputFormat::Json => println!("{}", json::sessions_to_json(sessions)?),
    }
    Ok(())
}
