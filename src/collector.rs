//! Collector Layer
//!
//! Pluggable collectors that push metric samples into a caller-owned
//! channel. Each collector is registered under a unique name and is
//! instantiated through its factory.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing collectors
//! - [`TypedDesc`]: Static metric schema that stamps values into [`Metric`] samples
//! - [`CollectorRegistry`]: Name to factory mapping with reject-on-duplicate policy
//! - [`scrape`]: Runs a set of collectors concurrently and drains their samples
//!
//! # Example
//!
//! ```rust
//! use node_agent::collector::{CollectorRegistry, builtin};
//!
//! let mut registry = CollectorRegistry::new();
//! builtin::register_all(&mut registry).unwrap();
//! assert!(registry.contains("loadavg"));
//! ```

pub mod builtin;
mod deprecation;
mod metric;
mod registry;
mod scrape;
mod traits;

pub use deprecation::warn_deprecated;
pub use metric::{Metric, MetricSender, NAMESPACE, TypedDesc, ValueType, metric_channel};
pub use registry::{CollectorRegistry, Factory, NamedCollector, RegistryError};
pub use scrape::{
    CollectorOutcome, DEFAULT_CHANNEL_CAPACITY, ScrapeOptions, ScrapeReport, scrape,
};
pub use traits::{Collector, CollectorError};
