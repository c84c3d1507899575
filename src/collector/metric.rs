//! Typed metric descriptors, metric samples and the sample channel.

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::Opts;
use prometheus::core::Desc;
use prometheus::proto::MetricType;
use tokio::sync::mpsc;

use crate::collector::CollectorError;

/// Namespace prefixed to every metric name.
pub const NAMESPACE: &str = "node";

/// Value semantics of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Monotonically non-decreasing per label combination.
    Counter,
    /// Arbitrary point-in-time value.
    Gauge,
    /// Value with unknown semantics.
    Untyped,
}

impl ValueType {
    /// Metric type used by the prometheus data model.
    pub fn metric_type(self) -> MetricType {
        match self {
            Self::Counter => MetricType::COUNTER,
            Self::Gauge => MetricType::GAUGE,
            Self::Untyped => MetricType::UNTYPED,
        }
    }

    /// Lowercase name of the value type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Untyped => "untyped",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static schema of one metric exposed by a collector.
///
/// Binds a fully-qualified name, help text, ordered label names and a
/// [`ValueType`]. A collector builds its descriptors once and stamps them
/// with values on every update.
#[derive(Debug, Clone)]
pub struct TypedDesc {
    desc: Arc<Desc>,
    value_type: ValueType,
}

impl TypedDesc {
    /// Build a descriptor named `node_{subsystem}_{name}`.
    ///
    /// An empty `subsystem` yields `node_{name}`.
    ///
    /// # Errors
    /// Returns an error if the metric name, a label name or the help text is
    /// invalid, or if label names are duplicated.
    pub fn new(
        subsystem: &str,
        name: &str,
        help: &str,
        label_names: &[&str],
        value_type: ValueType,
    ) -> Result<Self, prometheus::Error> {
        let fq_name = Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(subsystem)
            .fq_name();
        let desc = Desc::new(
            fq_name,
            help.to_string(),
            label_names.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;

        Ok(Self {
            desc: Arc::new(desc),
            value_type,
        })
    }

    /// Fully-qualified metric name.
    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    /// Help text.
    pub fn help(&self) -> &str {
        &self.desc.help
    }

    /// Ordered label names.
    pub fn label_names(&self) -> &[String] {
        &self.desc.variable_labels
    }

    /// Value semantics.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Stamp `value` and `label_values` into a metric sample.
    ///
    /// `label_values` is paired positionally with [`label_names`](Self::label_names).
    ///
    /// # Panics
    /// Panics if the number of label values differs from the number of label
    /// names. A malformed sample would corrupt the exposition output, so this
    /// is treated as a programming error.
    pub fn stamp<S: AsRef<str>>(&self, value: f64, label_values: &[S]) -> Metric {
        let expected = self.desc.variable_labels.len();
        if label_values.len() != expected {
            panic!(
                "inconsistent label cardinality for {}: expected {} label values but got {}",
                self.desc.fq_name,
                expected,
                label_values.len()
            );
        }

        Metric {
            desc: Arc::clone(&self.desc),
            value_type: self.value_type,
            value,
            label_values: label_values
                .iter()
                .map(|v| v.as_ref().to_string())
                .collect(),
        }
    }
}

/// A single labeled numeric observation bound to a [`TypedDesc`].
#[derive(Debug, Clone)]
pub struct Metric {
    desc: Arc<Desc>,
    value_type: ValueType,
    value: f64,
    label_values: Vec<String>,
}

impl Metric {
    /// Fully-qualified metric name.
    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Label pairs in descriptor order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.desc
            .variable_labels
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Value of the label called `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Write half of the metric channel lent to a collector during
/// [`Collector::update`](crate::collector::Collector::update).
///
/// Not `Clone`: the owner decides when the channel closes.
pub struct MetricSender {
    tx: mpsc::Sender<Metric>,
}

impl MetricSender {
    /// Wrap the sending side of a metric channel.
    pub fn new(tx: mpsc::Sender<Metric>) -> Self {
        Self { tx }
    }

    /// Push a sample, waiting for capacity if the channel is full.
    ///
    /// # Errors
    /// Returns [`CollectorError::ChannelClosed`] if the receiver was dropped.
    pub async fn send(&self, metric: Metric) -> Result<(), CollectorError> {
        self.tx
            .send(metric)
            .await
            .map_err(|_| CollectorError::ChannelClosed)
    }
}

impl std::fmt::Debug for MetricSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSender")
            .field("capacity", &self.tx.capacity())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Create a bounded metric channel.
pub fn metric_channel(capacity: usize) -> (MetricSender, mpsc::Receiver<Metric>) {
    let (tx, rx) = mpsc::channel(capacity);
    (MetricSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_desc() -> TypedDesc {
        TypedDesc::new(
            "network",
            "receive_bytes_total",
            "Network device statistic receive_bytes.",
            &["device", "agent_ip"],
            ValueType::Counter,
        )
        .unwrap()
    }

    #[test]
    fn test_fq_name_joins_namespace_and_subsystem() {
        let desc = device_desc();
        assert_eq!(desc.fq_name(), "node_network_receive_bytes_total");
        assert_eq!(desc.label_names(), &["device", "agent_ip"]);
        assert_eq!(desc.value_type(), ValueType::Counter);
    }

    #[test]
    fn test_fq_name_without_subsystem() {
        let desc = TypedDesc::new("", "load1", "1m load average.", &[], ValueType::Gauge).unwrap();
        assert_eq!(desc.fq_name(), "node_load1");
    }

    #[test]
    fn test_invalid_label_name_rejected() {
        let result = TypedDesc::new("disk", "reads", "Reads.", &["bad-label"], ValueType::Gauge);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_help_rejected() {
        let result = TypedDesc::new("disk", "reads", "", &[], ValueType::Gauge);
        assert!(result.is_err());
    }

    #[test]
    fn test_stamp_pairs_labels_positionally() {
        let metric = device_desc().stamp(1024.0, &["eth0", "10.42.0.1"]);

        assert_eq!(metric.name(), "node_network_receive_bytes_total");
        assert_eq!(metric.value(), 1024.0);
        assert_eq!(metric.value_type(), ValueType::Counter);
        let labels: Vec<_> = metric.labels().collect();
        assert_eq!(labels, vec![("device", "eth0"), ("agent_ip", "10.42.0.1")]);
        assert_eq!(metric.label("agent_ip"), Some("10.42.0.1"));
        assert_eq!(metric.label("missing"), None);
    }

    #[test]
    fn test_stamp_accepts_owned_strings() {
        let cores: Vec<String> = (0..2).map(|c| c.to_string()).collect();
        let desc = TypedDesc::new("cpu", "online", "CPU online.", &["cpu"], ValueType::Gauge)
            .unwrap();
        let metric = desc.stamp(1.0, &cores[1..]);
        assert_eq!(metric.label("cpu"), Some("1"));
    }

    #[test]
    #[should_panic(expected = "inconsistent label cardinality")]
    fn test_stamp_zero_labels_panics() {
        let empty: [&str; 0] = [];
        device_desc().stamp(1.0, &empty);
    }

    #[test]
    #[should_panic(expected = "inconsistent label cardinality")]
    fn test_stamp_one_short_panics() {
        device_desc().stamp(1.0, &["eth0"]);
    }

    #[test]
    #[should_panic(expected = "inconsistent label cardinality")]
    fn test_stamp_one_extra_panics() {
        device_desc().stamp(1.0, &["eth0", "10.42.0.1", "extra"]);
    }

    #[test]
    fn test_value_type_maps_to_metric_type() {
        assert_eq!(ValueType::Counter.metric_type(), MetricType::COUNTER);
        assert_eq!(ValueType::Gauge.metric_type(), MetricType::GAUGE);
        assert_eq!(ValueType::Untyped.metric_type(), MetricType::UNTYPED);
        assert_eq!(ValueType::Gauge.to_string(), "gauge");
    }

    #[tokio::test]
    async fn test_sender_reports_closed_channel() {
        let (tx, rx) = metric_channel(1);
        drop(rx);
        let metric = device_desc().stamp(1.0, &["eth0", ""]);
        let result = tx.send(metric).await;
        assert!(matches!(result, Err(CollectorError::ChannelClosed)));
    }
}
