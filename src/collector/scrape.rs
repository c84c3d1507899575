//! Scrape driver running collectors concurrently over one shared channel.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::collector::{
    Collector, CollectorError, Metric, MetricSender, NamedCollector, TypedDesc, ValueType,
};

/// Default capacity of the shared metric channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Options for a single scrape cycle.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Deadline applied to each collector's update. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Capacity of the shared metric channel.
    pub channel_capacity: usize,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScrapeOptions {
    /// Set the per-collector deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the shared channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Result of one collector's update within a scrape cycle.
#[derive(Debug)]
pub struct CollectorOutcome {
    pub name: String,
    pub duration: Duration,
    pub result: Result<(), CollectorError>,
}

/// Samples and per-collector outcomes of a scrape cycle.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Samples drained from the shared channel, in arrival order.
    pub metrics: Vec<Metric>,
    /// One outcome per collector, sorted by name.
    pub outcomes: Vec<CollectorOutcome>,
}

impl ScrapeReport {
    /// Failed collectors and their errors.
    pub fn errors(&self) -> BTreeMap<&str, &CollectorError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
            .collect()
    }

    /// Names of collectors that succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.name.as_str())
    }

    /// Per-collector bookkeeping samples.
    ///
    /// Yields `node_scrape_collector_duration_seconds` and
    /// `node_scrape_collector_success` for every outcome. These are kept out
    /// of [`metrics`](Self::metrics) so the collector samples stay exactly
    /// what the collectors pushed.
    pub fn scrape_metrics(&self) -> Vec<Metric> {
        let descs = scrape_descs();
        let mut metrics = Vec::with_capacity(self.outcomes.len() * 2);
        for outcome in &self.outcomes {
            let labels = [outcome.name.as_str()];
            metrics.push(
                descs
                    .duration
                    .stamp(outcome.duration.as_secs_f64(), &labels),
            );
            let success = if outcome.result.is_ok() { 1.0 } else { 0.0 };
            metrics.push(descs.success.stamp(success, &labels));
        }
        metrics
    }
}

struct ScrapeDescs {
    duration: TypedDesc,
    success: TypedDesc,
}

fn scrape_descs() -> &'static ScrapeDescs {
    static DESCS: OnceLock<ScrapeDescs> = OnceLock::new();

    DESCS.get_or_init(|| ScrapeDescs {
        duration: TypedDesc::new(
            "scrape",
            "collector_duration_seconds",
            "Duration of a collector scrape.",
            &["collector"],
            ValueType::Gauge,
        )
        .expect("failed to build scrape duration descriptor"),
        success: TypedDesc::new(
            "scrape",
            "collector_success",
            "Whether a collector succeeded.",
            &["collector"],
            ValueType::Gauge,
        )
        .expect("failed to build scrape success descriptor"),
    })
}

/// Run every collector's update concurrently and drain their samples.
///
/// Each collector gets its own [`MetricSender`] over one shared channel and
/// runs in its own Tokio task. The channel is drained until every sender is
/// gone, so samples from succeeding collectors are reported even when
/// others fail.
///
/// # Panics
/// A panic inside a collector (for example a label cardinality mismatch in
/// [`TypedDesc::stamp`]) is resumed on the caller.
pub async fn scrape(collectors: &[NamedCollector], options: &ScrapeOptions) -> ScrapeReport {
    let started = Instant::now();
    let (tx, mut rx) = mpsc::channel(options.channel_capacity.max(1));
    let mut tasks = JoinSet::new();

    for named in collectors {
        let out = MetricSender::new(tx.clone());
        let collector = Arc::clone(named.collector());
        let name = named.name().to_string();
        let deadline = options.timeout;
        tasks.spawn(run_update(name, collector, out, deadline));
    }
    drop(tx);

    let mut metrics = Vec::new();
    while let Some(metric) = rx.recv().await {
        metrics.push(metric);
    }

    let mut outcomes = Vec::with_capacity(collectors.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => tracing::debug!(error = %e, "Collector task did not complete"),
        }
    }
    record_cancelled(collectors, &mut outcomes, started.elapsed());
    outcomes.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!(
        collectors = collectors.len(),
        samples = metrics.len(),
        failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
        "Scrape completed"
    );

    ScrapeReport { metrics, outcomes }
}

/// Add a [`CollectorError::Cancelled`] outcome for every collector whose task
/// ended without reporting, so each collector keeps exactly one outcome.
fn record_cancelled(
    collectors: &[NamedCollector],
    outcomes: &mut Vec<CollectorOutcome>,
    elapsed: Duration,
) {
    let mut reported: BTreeMap<&str, usize> = BTreeMap::new();
    for outcome in outcomes.iter() {
        *reported.entry(outcome.name.as_str()).or_default() += 1;
    }

    let mut missing = Vec::new();
    for named in collectors {
        match reported.get_mut(named.name()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => missing.push(named.name().to_string()),
        }
    }

    for name in missing {
        tracing::error!(collector = %name, "Collector task cancelled");
        outcomes.push(CollectorOutcome {
            name,
            duration: elapsed,
            result: Err(CollectorError::Cancelled),
        });
    }
}

/// Execute a single update and record the result.
async fn run_update(
    name: String,
    collector: Arc<dyn Collector>,
    out: MetricSender,
    deadline: Option<Duration>,
) -> CollectorOutcome {
    let start = Instant::now();
    tracing::debug!(collector = %name, "Running update");

    let result = match deadline {
        Some(limit) => tokio::time::timeout(limit, collector.update(&out))
            .await
            .unwrap_or_else(|_| Err(CollectorError::Timeout)),
        None => collector.update(&out).await,
    };
    // Release the channel before reporting so the drain can finish.
    drop(out);

    let duration = start.elapsed();
    let duration_ms = duration.as_millis();
    match &result {
        Ok(()) => tracing::debug!(collector = %name, duration_ms, "Collector succeeded"),
        Err(e) => tracing::error!(collector = %name, duration_ms, error = %e, "Collector failed"),
    }

    CollectorOutcome {
        name,
        duration,
        result,
    }
}
