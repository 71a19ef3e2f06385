//! Plugin registry
//!
//! Maps the plugin names used in configuration files to factories that
//! build configured plugin instances.

use super::PluginConfig;
use crate::{
    error::{Error, Result},
    plugin::Plugin,
    plugins::ArtifactsFactory,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Builds a plugin from its configuration options
pub trait PluginFactory: Send + Sync {
    /// Name the plugin is configured under
    fn name(&self) -> &str;

    /// `base_dir` is the directory relative paths in `options` resolve against
    fn build(&self, options: &Value, base_dir: &Path) -> Result<Arc<dyn Plugin>>;
}

/// Registry for plugin factories
#[derive(Clone)]
pub struct PluginRegistry {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    /// Create a new registry with the built-in plugins
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ArtifactsFactory));
        registry
    }

    /// Create a registry without any plugins
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any factory with the same name
    pub fn register(&mut self, factory: Arc<dyn PluginFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered plugin names, sorted
    pub fn list_plugins(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate the plugin a config entry names
    pub fn build(&self, config: &PluginConfig, base_dir: &Path) -> Result<Arc<dyn Plugin>> {
        let factory = self.get(&config.name).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unknown plugin `{}` (available: {})",
                config.name,
                self.list_plugins().join(", ")
            ))
        })?;
        factory.build(&config.options, base_dir)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
