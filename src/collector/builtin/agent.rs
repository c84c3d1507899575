//! Instance identity info collector.
//!
//! Exposes the process identity resolved at startup as a constant gauge so
//! that scrapers can join it against the other metric families.

use crate::collector::{Collector, CollectorError, MetricSender, TypedDesc, ValueType};
use crate::metadata::ProcessIdentity;

/// Registered collector name.
pub const NAME: &str = "agent";

/// Emits `node_agent_info{agent_ip, environment_uuid} 1`.
///
/// Unresolved identity fields are reported as empty label values.
pub struct AgentInfoCollector {
    info: TypedDesc,
    agent_ip: String,
    environment_uuid: String,
}

impl AgentInfoCollector {
    /// Create a collector reporting `identity`.
    pub fn new(identity: &ProcessIdentity) -> Result<Self, CollectorError> {
        let info = TypedDesc::new(
            "agent",
            "info",
            "Instance identity resolved from the metadata service.",
            &["agent_ip", "environment_uuid"],
            ValueType::Gauge,
        )?;

        Ok(Self {
            info,
            agent_ip: identity.agent_ip().to_string(),
            environment_uuid: identity.environment_uuid().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Collector for AgentInfoCollector {
    async fn update(&self, out: &MetricSender) -> Result<(), CollectorError> {
        out.send(
            self.info
                .stamp(1.0, &[&self.agent_ip, &self.environment_uuid]),
        )
        .await
    }
}
