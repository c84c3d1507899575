//! Configuration module for the agent.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Metadata service settings (base URL, request timeout)
//! - Scrape settings (interval, per-collector timeout, channel capacity)
//! - Enabled collector selection

mod app;
mod validation;

pub use app::{AgentConfig, CollectorsConfig, MetadataConfig, ScrapeConfig};
pub use validation::{ConfigError, env_or, parse_duration};

// Re-export constants
pub use app::{DEFAULT_METADATA_TIMEOUT, DEFAULT_SCRAPE_INTERVAL};
