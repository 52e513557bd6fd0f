//! Logging setup
//!
//! Logs go to stderr so the report on stdout stays machine-readable.
//!
//! # Environment Variables
//!
//! - `PRIMESHARD_LOG` - Log filter (overrides RUST_LOG)
//! - `RUST_LOG` - Standard Rust log filter (fallback)
//!
//! Without either, the level is `info`, or `debug` with `--debug`.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base log level (default: INFO)
    pub level: Level,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
    /// Show thread names, useful to tell scan workers apart
    pub show_thread_names: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            filter: None,
            show_thread_names: false,
        }
    }
}

impl LogConfig {
    /// Preset for the `--debug` flag
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Self {
                level: Level::DEBUG,
                filter: None,
                show_thread_names: true,
            }
        } else {
            Self::default()
        }
    }

    /// Apply `PRIMESHARD_LOG` / `RUST_LOG` when no filter is set yet
    pub fn with_env_overrides(mut self) -> Self {
        if self.filter.is_none() {
            self.filter = std::env::var("PRIMESHARD_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .ok();
        }
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let default = || EnvFilter::new(self.level.to_string().to_lowercase());
        match self.filter {
            Some(ref filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| {
                eprintln!("Warning: Invalid log filter '{}', using default", filter);
                default()
            }),
            None => default(),
        }
    }
}

/// Install the global subscriber
///
/// Subsequent calls are ignored.
pub fn init(config: LogConfig) {
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_names(config.show_thread_names)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(config.build_filter())
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.filter.is_none());
        assert_eq!(LogConfig::from_debug_flag(false), config);
    }

    #[test]
    fn test_debug_flag() {
        let config = LogConfig::from_debug_flag(true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.show_thread_names);
    }

    #[test]
    fn test_explicit_filter_not_overridden() {
        let config = LogConfig {
            filter: Some("primeshard=trace".to_string()),
            ..LogConfig::default()
        }
        .with_env_overrides();
        assert_eq!(config.filter.as_deref(), Some("primeshard=trace"));
    }

    #[test]
    fn test_invalid_filter_falls_back() {
        let config = LogConfig {
            filter: Some("primeshard=loud".to_string()),
            ..LogConfig::default()
        };
        assert!(EnvFilter::try_new("primeshard=loud").is_err());
        let _ = config.build_filter();
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(LogConfig::default());
        init(LogConfig::from_debug_flag(true));
    }
}
