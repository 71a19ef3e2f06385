//! Plugin capability interface
//!
//! Every capability is optional: the default methods mean "this plugin does
//! not take part in that phase". Plugins report failures as `anyhow` errors;
//! the pipeline attaches the plugin name when surfacing them.

use crate::{
    command::SideCommand,
    types::{Contract, ContractDefinition},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Input handed to [`Plugin::run`]
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// The entire current contract set, in map order
    pub contracts: &'a [Arc<Contract>],
    pub is_typescript: bool,
    /// Path of the artifact being generated
    pub out: &'a Path,
}

/// Source fragments contributed by one plugin run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    pub imports: Option<String>,
    pub prepend: Option<String>,
    pub content: Option<String>,
}

impl PluginOutput {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn with_imports(mut self, imports: impl Into<String>) -> Self {
        self.imports = Some(imports.into());
        self
    }

    pub fn with_prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = Some(prepend.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_none() && self.prepend.is_none() && self.content.is_none()
    }
}

/// A transformation step configured for one output target
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in banners and error messages
    fn name(&self) -> &str;

    /// Reject the whole run before any contract is resolved
    async fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Contracts this plugin contributes to the target
    async fn contracts(&self) -> anyhow::Result<Vec<ContractDefinition>> {
        Ok(Vec::new())
    }

    /// Produce source fragments from the current contract set.
    ///
    /// `Ok(None)` means the plugin has nothing to render.
    async fn run(&self, _context: RunContext<'_>) -> anyhow::Result<Option<PluginOutput>> {
        Ok(None)
    }

    /// Filesystem locations to watch in watch mode
    fn watch(&self) -> Option<Arc<dyn WatchDescriptor>> {
        None
    }
}

/// Describes what a plugin watches and how filesystem events map to
/// contract changes.
///
/// Callbacks returning `Ok(None)` mean the event is ignored.
#[async_trait]
pub trait WatchDescriptor: Send + Sync {
    /// Paths to watch; resolved once when the watcher is set up.
    ///
    /// A path that does not exist yet is picked up once it is created.
    async fn paths(&self) -> anyhow::Result<Vec<PathBuf>>;

    async fn on_add(&self, _path: &Path) -> anyhow::Result<Option<ContractDefinition>> {
        Ok(None)
    }

    async fn on_change(&self, _path: &Path) -> anyhow::Result<Option<ContractDefinition>> {
        Ok(None)
    }

    /// Name of the contract to drop when `path` disappears
    async fn on_remove(&self, _path: &Path) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Process to start once the watcher is ready
    fn command(&self) -> Option<SideCommand> {
        None
    }
}
