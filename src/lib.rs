//! Node Agent - Pluggable Collector Core
//!
//! This crate provides the extensible core of a metrics-collection agent.
//! Independently implemented collectors, one per metric family, are
//! registered by name and invoked uniformly to produce point-in-time
//! measurements.
//!
//! # Architecture
//!
//! - **Metadata**: One-shot instance identity resolution against a local metadata service
//! - **Context**: Process-wide, read-only state shared with collector factories
//! - **Collectors**: Registry, execution contract, typed metric descriptors and scrape driver
//! - **Config**: YAML configuration with environment fallbacks
//!
//! # Example
//!
//! ```rust,no_run
//! use node_agent::collector::{CollectorRegistry, ScrapeOptions, builtin, scrape};
//! use node_agent::config::MetadataConfig;
//! use node_agent::AgentContext;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let context = AgentContext::initialize(&MetadataConfig::default()).await;
//!
//! let mut registry = CollectorRegistry::new();
//! builtin::register_all(&mut registry)?;
//!
//! let collectors = registry.build_all(&context, None)?;
//! let report = scrape(&collectors, &ScrapeOptions::default()).await;
//! println!("{} samples, {} errors", report.metrics.len(), report.errors().len());
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod context;
pub mod metadata;

pub use collector::{
    Collector, CollectorError, CollectorRegistry, Metric, MetricSender, NamedCollector,
    RegistryError, TypedDesc, ValueType,
};
pub use context::AgentContext;
pub use metadata::{MetadataResolver, ProcessIdentity};
