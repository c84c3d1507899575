//! Collector registry mapping unique names to collector factories.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::sync::Arc;

use thiserror::Error;

use crate::collector::{Collector, CollectorError, warn_deprecated};
use crate::context::AgentContext;

/// Constructor producing a fresh collector instance.
///
/// Receives the read-only [`AgentContext`] so collectors can capture the
/// process identity they need.
pub type Factory =
    Arc<dyn Fn(&AgentContext) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync>;

/// Errors raised by the collector registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A collector is already registered under this name.
    #[error("collector '{0}' is already registered")]
    DuplicateName(String),

    /// No collector is registered under this name.
    #[error("unknown collector '{0}'")]
    UnknownCollector(String),

    /// The collector factory failed.
    #[error("failed to build collector '{name}': {source}")]
    Build {
        name: String,
        #[source]
        source: CollectorError,
    },
}

struct Entry {
    factory: Factory,
    deprecated: bool,
}

/// A collector instance together with the name it was registered under.
#[derive(Clone)]
pub struct NamedCollector {
    name: String,
    collector: Arc<dyn Collector>,
}

impl NamedCollector {
    /// Pair a collector with a name.
    pub fn new(name: impl Into<String>, collector: Arc<dyn Collector>) -> Self {
        Self {
            name: name.into(),
            collector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collector(&self) -> &Arc<dyn Collector> {
        &self.collector
    }
}

impl std::fmt::Debug for NamedCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedCollector")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of available collectors.
///
/// Populated through `&mut self` during initialization, then shared
/// read-only. Names are unique: registering a name twice is rejected and the
/// first registration is kept.
#[derive(Default)]
pub struct CollectorRegistry {
    entries: BTreeMap<String, Entry>,
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateName`] if `name` is taken. The
    /// registry is left unchanged.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&AgentContext) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(factory), false)
    }

    /// Register a collector whose name is deprecated.
    ///
    /// Building it logs a deprecation warning before invoking the factory.
    pub fn register_deprecated<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&AgentContext) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(factory), true)
    }

    /// Look up the factory registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&Factory> {
        self.entries.get(name).map(|e| &e.factory)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `name` is registered as deprecated.
    pub fn is_deprecated(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.deprecated)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate the collector registered under `name`.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownCollector`] if nothing is registered under `name`
    /// - [`RegistryError::Build`] if the factory fails
    pub fn build(&self, name: &str, ctx: &AgentContext) -> Result<NamedCollector, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCollector(name.to_string()))?;

        if entry.deprecated {
            warn_deprecated(name);
        }

        let collector = (entry.factory)(ctx).map_err(|source| RegistryError::Build {
            name: name.to_string(),
            source,
        })?;

        tracing::debug!(collector = %name, "Collector built");
        Ok(NamedCollector::new(name, Arc::from(collector)))
    }

    /// Instantiate the collectors named in `enabled`, or every registered
    /// collector when `enabled` is `None`.
    ///
    /// The order of `enabled` is preserved. Stops at the first failure.
    pub fn build_all(
        &self,
        ctx: &AgentContext,
        enabled: Option<&[String]>,
    ) -> Result<Vec<NamedCollector>, RegistryError> {
        match enabled {
            Some(names) => names.iter().map(|name| self.build(name, ctx)).collect(),
            None => self.names().map(|name| self.build(name, ctx)).collect(),
        }
    }

    // --- Private helpers ---

    fn insert(
        &mut self,
        name: String,
        factory: Factory,
        deprecated: bool,
    ) -> Result<(), RegistryError> {
        match self.entries.entry(name) {
            MapEntry::Occupied(occupied) => {
                tracing::error!(collector = %occupied.key(), "Duplicate collector registration");
                Err(RegistryError::DuplicateName(occupied.key().clone()))
            }
            MapEntry::Vacant(vacant) => {
                tracing::debug!(collector = %vacant.key(), deprecated, "Collector registered");
                vacant.insert(Entry {
                    factory,
                    deprecated,
                });
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
