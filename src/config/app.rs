//! Application configuration structures.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::{DEFAULT_CHANNEL_CAPACITY, ScrapeOptions};
use crate::metadata::{DEFAULT_METADATA_URL, METADATA_URL_ENV};

use super::validation::{ConfigError, env_or};

// =============================================================================
// Constants
// =============================================================================

/// Default scrape interval (15 seconds).
pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(15);

/// Default metadata request timeout (5 seconds).
pub const DEFAULT_METADATA_TIMEOUT: Duration = crate::metadata::DEFAULT_TIMEOUT;

fn default_metadata_timeout() -> Duration {
    DEFAULT_METADATA_TIMEOUT
}

fn default_scrape_interval() -> Duration {
    DEFAULT_SCRAPE_INTERVAL
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// =============================================================================
// Metadata Configuration
// =============================================================================

/// Metadata service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Base URL of the metadata service. Falls back to `RANCHER_METADATA`,
    /// then to the link-local default.
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout (default: 5s).
    #[serde(default = "default_metadata_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }
}

impl MetadataConfig {
    /// Effective base URL: configured value, else `RANCHER_METADATA`, else the default.
    pub fn base_url(&self) -> String {
        self.base_url_from_env(METADATA_URL_ENV)
    }

    fn base_url_from_env(&self, env_key: &str) -> String {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => env_or(env_key, DEFAULT_METADATA_URL),
        }
    }
}

// =============================================================================
// Scrape Configuration
// =============================================================================

/// Scrape cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Interval between scrape cycles (default: 15s).
    #[serde(default = "default_scrape_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Per-collector deadline (default: none).
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Capacity of the shared metric channel (default: 1024).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCRAPE_INTERVAL,
            timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScrapeConfig {
    /// Scrape driver options for this configuration.
    pub fn to_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            timeout: self.timeout,
            channel_capacity: self.channel_capacity,
        }
    }
}

// =============================================================================
// Collector Selection
// =============================================================================

/// Enabled collector selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// Collectors to run, in order. `None` runs every registered collector.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Metadata service configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Scrape cycle configuration.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Collector selection.
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

impl AgentConfig {
    /// Load and validate configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "metadata.timeout must be greater than zero".to_string(),
            ));
        }

        if self.scrape.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "scrape.interval must be greater than zero".to_string(),
            ));
        }

        if self.scrape.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "scrape.timeout must be greater than zero".to_string(),
            ));
        }

        if self.scrape.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "scrape.channel_capacity must be greater than zero".to_string(),
            ));
        }

        if let Some(ref enabled) = self.collectors.enabled {
            let mut seen = HashSet::new();
            for name in enabled {
                if name.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "collectors.enabled contains an empty name".to_string(),
                    ));
                }
                if !seen.insert(name.as_str()) {
                    return Err(ConfigError::ValidationError(format!(
                        "collectors.enabled lists '{}' more than once",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AgentConfig::from_yaml("{}").unwrap();

        assert_eq!(config.metadata.url, None);
        assert_eq!(config.metadata.timeout, DEFAULT_METADATA_TIMEOUT);
        assert_eq!(config.scrape.interval, DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(config.scrape.timeout, None);
        assert_eq!(config.scrape.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.collectors.enabled.is_none());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
metadata:
  url: http://metadata.internal
  timeout: 2s
scrape:
  interval: 1m
  timeout: 10s
  channel_capacity: 64
collectors:
  enabled: [loadavg, agent]
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.metadata.base_url(), "http://metadata.internal");
        assert_eq!(config.metadata.timeout, Duration::from_secs(2));
        assert_eq!(config.scrape.interval, Duration::from_secs(60));
        assert_eq!(config.scrape.timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            config.collectors.enabled,
            Some(vec!["loadavg".to_string(), "agent".to_string()])
        );

        let options = config.scrape.to_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(10)));
        assert_eq!(options.channel_capacity, 64);
    }

    #[test]
    fn test_base_url_default_when_env_unset() {
        let config = MetadataConfig::default();
        assert_eq!(
            config.base_url_from_env("NODE_AGENT_TEST_UNSET_METADATA"),
            DEFAULT_METADATA_URL
        );
    }

    #[test]
    fn test_base_url_empty_config_falls_through() {
        let config = MetadataConfig {
            url: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            config.base_url_from_env("NODE_AGENT_TEST_UNSET_METADATA"),
            "http://169.254.169.250"
        );
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let err = AgentConfig::from_yaml("scrape:\n  interval: 0s\n").unwrap_err();
        assert!(err.to_string().contains("scrape.interval"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let err = AgentConfig::from_yaml("scrape:\n  channel_capacity: 0\n").unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }

    #[test]
    fn test_validate_rejects_duplicate_collectors() {
        let err =
            AgentConfig::from_yaml("collectors:\n  enabled: [agent, agent]\n").unwrap_err();
        assert!(err.to_string().contains("'agent' more than once"));
    }

    #[test]
    fn test_invalid_duration_is_parse_error() {
        let err = AgentConfig::from_yaml("scrape:\n  interval: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scrape:\n  interval: 30s").unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.scrape.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AgentConfig::load("/nonexistent/node-agent.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
