//! Core collector trait and error type.

use thiserror::Error;

use crate::collector::MetricSender;

/// Errors returned by a collector's [`Collector::update`].
///
/// Each variant identifies the sub-measurement that could not be obtained.
/// The scrape driver keys these by collector name, so the collector itself
/// does not need to repeat its own name.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A measurement source was unavailable.
    #[error("{0}")]
    Update(String),

    /// Reading a measurement source failed.
    #[error("failed to read {what}: {source}")]
    Io {
        /// Source being read (file path, device, sensor).
        what: String,
        #[source]
        source: std::io::Error,
    },

    /// Measurement source returned content that could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Collection exceeded the deadline imposed by the caller.
    #[error("timeout elapsed")]
    Timeout,

    /// The metric channel reader is gone.
    #[error("metric channel closed")]
    ChannelClosed,

    /// The task running the update ended before reporting a result.
    #[error("collector task cancelled")]
    Cancelled,

    /// Metric descriptor construction failed.
    #[error("metric error: {0}")]
    Metric(#[from] prometheus::Error),
}

impl CollectorError {
    /// Create an [`CollectorError::Update`] from a description of the failed measurement.
    pub fn update(message: impl Into<String>) -> Self {
        Self::Update(message.into())
    }

    /// Create an [`CollectorError::Io`] tagged with the source being read.
    pub fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            what: what.into(),
            source,
        }
    }
}

/// Core collector trait, one implementation per metric family.
///
/// Collectors are created by the factory they are registered under and then
/// invoked once per scrape cycle.
///
/// # Contract
///
/// - Samples are pushed through the lent [`MetricSender`]. The sender is only
///   borrowed for the duration of the call, so nothing can be pushed after
///   `update` returns and the channel lifecycle stays with the caller.
/// - On `Ok(())` every sample intended for this cycle has been pushed.
/// - On `Err` the error names the failed sub-measurement. Whether samples
///   pushed before the failure are kept is a per-collector policy and must be
///   documented on the implementation.
/// - May block on I/O. Must not retry internally.
/// - Calls on *different* collectors run concurrently. A single instance is
///   never updated concurrently with itself by the scrape driver.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Collect metrics for one scrape cycle and push them into `out`.
    async fn update(&self, out: &MetricSender) -> Result<(), CollectorError>;
}
