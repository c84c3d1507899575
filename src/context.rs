//! Process-wide agent context.
//!
//! The context is built once during initialization, before any collector is
//! instantiated, and is read-only afterwards. Collector factories receive it
//! by reference and copy out what they need.

use crate::config::MetadataConfig;
use crate::metadata::{MetadataResolver, ProcessIdentity};

/// Read-only state shared with every collector factory.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    identity: ProcessIdentity,
}

impl AgentContext {
    /// Create a context from an already known identity.
    pub fn new(identity: ProcessIdentity) -> Self {
        Self { identity }
    }

    /// Resolve the instance identity and build the context.
    ///
    /// Never fails: an unreachable metadata service yields an empty identity
    /// and the agent keeps running without identity labels.
    pub async fn initialize(config: &MetadataConfig) -> Self {
        let base_url = config.base_url();
        let identity = match MetadataResolver::new(&base_url, config.timeout) {
            Ok(resolver) => resolver.resolve_identity().await,
            Err(e) => {
                tracing::error!(base_url = %base_url, error = %e, "Failed to create metadata client");
                ProcessIdentity::default()
            }
        };

        if !identity.is_resolved() {
            tracing::warn!(base_url = %base_url, "Instance identity unresolved, metrics will lack identity labels");
        }

        Self { identity }
    }

    /// Instance identity resolved at startup.
    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }
}
