//! Load average collector.
//!
//! Reads the 1, 5 and 15 minute load averages from `/proc/loadavg`.

use std::path::{Path, PathBuf};

use crate::collector::{Collector, CollectorError, MetricSender, TypedDesc, ValueType};

/// Registered collector name.
pub const NAME: &str = "loadavg";

/// Default procfs location.
pub const DEFAULT_PATH: &str = "/proc/loadavg";

/// Emits `node_load1`, `node_load5` and `node_load15`.
///
/// The file is parsed completely before anything is pushed, so a read or
/// parse failure reports no samples. A closed channel can still interrupt
/// the update after some samples were sent.
pub struct LoadavgCollector {
    path: PathBuf,
    loads: [TypedDesc; 3],
}

impl LoadavgCollector {
    /// Create a collector reading [`DEFAULT_PATH`].
    pub fn new() -> Result<Self, CollectorError> {
        Self::with_path(DEFAULT_PATH)
    }

    /// Create a collector reading `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, CollectorError> {
        let loads = [
            TypedDesc::new("", "load1", "1m load average.", &[], ValueType::Gauge)?,
            TypedDesc::new("", "load5", "5m load average.", &[], ValueType::Gauge)?,
            TypedDesc::new("", "load15", "15m load average.", &[], ValueType::Gauge)?,
        ];

        Ok(Self {
            path: path.into(),
            loads,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Collector for LoadavgCollector {
    async fn update(&self, out: &MetricSender) -> Result<(), CollectorError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CollectorError::io(self.path.display().to_string(), e))?;
        let values = parse_loadavg(&content)?;

        let no_labels: [&str; 0] = [];
        for (desc, value) in self.loads.iter().zip(values) {
            tracing::trace!(metric = desc.fq_name(), value, "Load average");
            out.send(desc.stamp(value, &no_labels)).await?;
        }
        Ok(())
    }
}

/// Parse the first three fields of `/proc/loadavg`.
fn parse_loadavg(content: &str) -> Result<[f64; 3], CollectorError> {
    let mut fields = content.split_whitespace();
    let mut values = [0.0; 3];

    for (idx, value) in values.iter_mut().enumerate() {
        let field = fields.next().ok_or_else(|| {
            CollectorError::Parse(format!(
                "unexpected loadavg content: expected 3 fields, got {idx}"
            ))
        })?;
        *value = field.parse::<f64>().map_err(|e| {
            CollectorError::Parse(format!("invalid load average '{field}': {e}"))
        })?;
    }

    Ok(values)
}
