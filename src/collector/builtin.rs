//! Reference collectors shipped with the agent.
//!
//! - [`agent`]: Instance identity info gauge
//! - [`loadavg`]: System load averages from procfs
//!
//! Registration is explicit: call [`register_all`] during initialization.

pub mod agent;
pub mod loadavg;

use crate::collector::{Collector, CollectorError, CollectorRegistry, RegistryError};
use crate::context::AgentContext;

pub use agent::AgentInfoCollector;
pub use loadavg::LoadavgCollector;

/// Register every built-in collector.
///
/// # Errors
/// Returns [`RegistryError::DuplicateName`] if one of the built-in names is
/// already taken.
pub fn register_all(registry: &mut CollectorRegistry) -> Result<(), RegistryError> {
    registry.register(
        agent::NAME,
        |ctx: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            Ok(Box::new(AgentInfoCollector::new(ctx.identity())?))
        },
    )?;
    registry.register(
        loadavg::NAME,
        |_: &AgentContext| -> Result<Box<dyn Collector>, CollectorError> {
            Ok(Box::new(LoadavgCollector::new()?))
        },
    )?;
    Ok(())
}
