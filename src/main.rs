//! Node Agent Binary Entry Point
//!
//! Resolves the instance identity, builds the enabled collectors and runs
//! scrape cycles until interrupted. Core functionality is provided by the
//! `node_agent` library crate.

use std::time::Duration;

use clap::Parser;
use node_agent::{
    AgentContext,
    collector::{CollectorRegistry, NamedCollector, ScrapeOptions, builtin, scrape},
    config::{AgentConfig, parse_duration},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Node Agent - Pluggable Metric Collectors
#[derive(Parser, Debug)]
#[command(name = "node-agent", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, env = "NODE_AGENT_CONFIG")]
    config: Option<String>,

    /// Metadata service base URL (overrides config file and RANCHER_METADATA)
    #[arg(long)]
    metadata_url: Option<String>,

    /// Scrape interval (overrides config file), e.g. "15s"
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Run a single scrape cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,node_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Node Agent - Pluggable Metric Collectors");

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => {
            tracing::info!("Loading configuration from: {}", path);
            AgentConfig::load(path)?
        }
        None => AgentConfig::default(),
    };

    // Apply CLI overrides (CLI > config file > ENV)
    if let Some(url) = cli.metadata_url {
        config.metadata.url = Some(url);
    }
    if let Some(interval) = cli.interval {
        config.scrape.interval = interval;
    }
    config.validate()?;

    // Initialization phase: identity first, then registry
    let context = AgentContext::initialize(&config.metadata).await;

    let mut registry = CollectorRegistry::new();
    builtin::register_all(&mut registry)?;
    tracing::info!(
        "Available collectors: {}",
        registry.names().collect::<Vec<_>>().join(", ")
    );

    let collectors = registry.build_all(&context, config.collectors.enabled.as_deref())?;
    for collector in &collectors {
        tracing::info!("Enabled collector: {}", collector.name());
    }

    let options = config.scrape.to_options();

    if cli.once {
        run_cycle(&collectors, &options).await;
        return Ok(());
    }

    tracing::info!("Scraping every {:?}", config.scrape.interval);
    tracing::info!("Press Ctrl+C to shutdown");

    let mut ticker = tokio::time::interval(config.scrape.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_cycle(&collectors, &options).await,
            _ = &mut shutdown => break,
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run one scrape cycle and log its outcome.
async fn run_cycle(collectors: &[NamedCollector], options: &ScrapeOptions) {
    let report = scrape(collectors, options).await;

    for metric in report.metrics.iter().chain(report.scrape_metrics().iter()) {
        let labels = metric
            .labels()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect::<Vec<_>>()
            .join(",");
        tracing::debug!(
            "{}{{{}}} {} ({})",
            metric.name(),
            labels,
            metric.value(),
            metric.value_type()
        );
    }

    let errors = report.errors();
    for (name, error) in &errors {
        tracing::warn!("Collector '{}' failed: {}", name, error);
    }

    tracing::info!(
        "Scrape cycle complete: {} samples, {} collectors succeeded, {} failed",
        report.metrics.len(),
        report.succeeded().count(),
        errors.len()
    );
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
