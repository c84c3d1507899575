//! Collector Integration Tests
//!
//! Drives registered collectors end to end: registry -> factory -> scrape.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use node_agent::collector::{
    CollectorRegistry, MetricSender, RegistryError, ScrapeOptions, builtin, metric_channel, scrape,
};
use node_agent::{AgentContext, Collector, CollectorError, ProcessIdentity, TypedDesc, ValueType};

// =============================================================================
// Test Collectors
// =============================================================================

/// Always succeeds with one gauge sample.
struct NetdevCollector {
    up: TypedDesc,
}

impl NetdevCollector {
    fn new() -> Result<Self, CollectorError> {
        Ok(Self {
            up: TypedDesc::new(
                "network",
                "up",
                "Value is 1 if operstate is 'up', 0 otherwise.",
                &["device"],
                ValueType::Gauge,
            )?,
        })
    }
}

#[async_trait::async_trait]
impl Collector for NetdevCollector {
    async fn update(&self, out: &MetricSender) -> Result<(), CollectorError> {
        out.send(self.up.stamp(42.0, &["eth0"])).await
    }
}

/// Always fails.
struct HwmonCollector;

#[async_trait::async_trait]
impl Collector for HwmonCollector {
    async fn update(&self, _out: &MetricSender) -> Result<(), CollectorError> {
        Err(CollectorError::update("sensor unavailable"))
    }
}

fn build_registry() -> CollectorRegistry {
    let mut registry = CollectorRegistry::new();
    registry
        .register("a", |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            Ok(Box::new(NetdevCollector::new()?))
        })
        .expect("register a");
    registry
        .register("b", |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            Ok(Box::new(HwmonCollector))
        })
        .expect("register b");
    registry
}

// =============================================================================
// Scrape Tests
// =============================================================================

#[tokio::test]
async fn test_success_and_failure_end_to_end() {
    let registry = build_registry();
    let context = AgentContext::default();
    let collectors = registry.build_all(&context, None).unwrap();

    let report = scrape(&collectors, &ScrapeOptions::default()).await;

    assert_eq!(report.metrics.len(), 1);
    let metric = &report.metrics[0];
    assert_eq!(metric.name(), "node_network_up");
    assert_eq!(metric.value(), 42.0);
    assert_eq!(metric.value_type(), ValueType::Gauge);
    assert_eq!(metric.labels().collect::<Vec<_>>(), vec![("device", "eth0")]);

    let errors: BTreeMap<_, _> = report
        .errors()
        .into_iter()
        .map(|(name, e)| (name.to_string(), e.to_string()))
        .collect();
    let expected = BTreeMap::from([("b".to_string(), "sensor unavailable".to_string())]);
    assert_eq!(errors, expected);
    assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn test_no_samples_after_update_returns() {
    let collector = NetdevCollector::new().unwrap();
    let (tx, mut rx) = metric_channel(8);

    collector.update(&tx).await.unwrap();
    // `update` only borrows the sender and `MetricSender` is not `Clone`, so
    // no writer can outlive this drop.
    drop(tx);

    let mut received = Vec::new();
    while let Some(metric) = rx.recv().await {
        received.push(metric);
    }
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].label("device"), Some("eth0"));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}

#[tokio::test]
async fn test_factories_build_fresh_instances() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);

    let mut registry = CollectorRegistry::new();
    registry
        .register("hwmon", move |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(HwmonCollector))
        })
        .unwrap();

    let context = AgentContext::default();
    registry.build("hwmon", &context).unwrap();
    registry.build("hwmon", &context).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_builtin_agent_collector_uses_context_identity() {
    let mut registry = CollectorRegistry::new();
    builtin::register_all(&mut registry).unwrap();

    let context = AgentContext::new(ProcessIdentity::new("10.42.3.7", "env-7f3a"));
    let enabled = vec!["agent".to_string()];
    let collectors = registry.build_all(&context, Some(&enabled)).unwrap();

    let report = scrape(&collectors, &ScrapeOptions::default()).await;
    assert!(report.errors().is_empty());
    assert_eq!(report.metrics.len(), 1);
    assert_eq!(report.metrics[0].name(), "node_agent_info");
    assert_eq!(report.metrics[0].label("agent_ip"), Some("10.42.3.7"));
    assert_eq!(report.metrics[0].label("environment_uuid"), Some("env-7f3a"));
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_distinct_registrations_enumerate_exactly() {
    let mut registry = CollectorRegistry::new();
    let names = ["textfile", "filesystem", "diskstats", "netdev"];
    for name in names {
        registry
            .register(name, |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
                Ok(Box::new(HwmonCollector))
            })
            .unwrap();
    }

    let mut expected: Vec<_> = names.to_vec();
    expected.sort();
    assert_eq!(registry.names().collect::<Vec<_>>(), expected);
    for name in names {
        assert!(registry.lookup(name).is_some());
    }
}

#[test]
fn test_duplicate_registration_is_fatal_error() {
    let mut registry = build_registry();
    let err = registry
        .register("a", |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            Ok(Box::new(HwmonCollector))
        })
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "a"));
    assert_eq!(err.to_string(), "collector 'a' is already registered");
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
}
