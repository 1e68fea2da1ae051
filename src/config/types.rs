//! Configuration types shared by the CLI and the API server.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_COOLDOWN, DEFAULT_DB_PATH, DEFAULT_GET_CACHE_AGE, MAX_REDIRECT_HOPS,
    MAX_RESPONSE_BODY_SIZE, PROBE_TIMEOUT_SECS, SCAN_TIMEOUT,
};

/// Logging level for the application.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Runtime configuration.
///
/// Constructed from CLI flags with environment fallbacks; every field has a
/// default so the struct can also be built programmatically.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path (API server only)
    pub db_path: PathBuf,

    /// Per-probe HTTP timeout
    pub probe_timeout: Duration,

    /// Overall wall-clock cap for one scan
    pub scan_timeout: Duration,

    /// Maximum redirect hops on the HTTPS probe
    pub max_redirects: usize,

    /// Response body size cap in bytes
    pub max_body_size: usize,

    /// Minimum interval between retrievals for one site key
    pub cooldown: Duration,

    /// Cache age accepted by the GET analyze endpoint
    pub get_cache_age: Duration,

    /// Allow scanning hosts that resolve to loopback/private ranges
    pub allow_private: bool,

    /// Public base URL for `details_url` fields, from `HTTPOBS_BASE_URL`
    pub base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            scan_timeout: SCAN_TIMEOUT,
            max_redirects: MAX_REDIRECT_HOPS,
            max_body_size: MAX_RESPONSE_BODY_SIZE,
            cooldown: DEFAULT_COOLDOWN,
            get_cache_age: DEFAULT_GET_CACHE_AGE,
            allow_private: false,
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_redirects, 20);
        assert_eq!(config.cooldown, Duration::from_secs(60));
        assert_eq!(config.get_cache_age, Duration::from_secs(86400));
        assert!(!config.allow_private);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }
}
