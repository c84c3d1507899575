//! Configuration errors and value parsing shared by the config file and CLI.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// The config file is not valid YAML or has mistyped fields.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A value is out of range, e.g. a zero scrape interval.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a scrape interval or timeout such as `15s` or `1m30s`.
///
/// Used as the clap value parser for `--interval`; surrounding whitespace is
/// ignored and a bare number without a unit is rejected.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Read environment variable `key`, using `fallback` when it is unset or empty.
pub fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}
