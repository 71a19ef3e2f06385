//! Contracts from compiled ABI artifacts on disk
//!
//! Each matching JSON file is one contract named after its file stem. A file
//! holds either a bare ABI array or an object with an `abi` field and an
//! optional `address` field, which covers the output of common Solidity
//! toolchains.

use crate::{
    command::SideCommand,
    config::PluginFactory,
    error::{Error, Result},
    plugin::{Plugin, WatchDescriptor},
    types::{ContractDefinition, RawAddress},
};
use anyhow::{Context, bail};
use async_trait::async_trait;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Name the plugin is configured under
pub const ARTIFACTS_PLUGIN: &str = "artifacts";

fn default_include() -> Vec<String> {
    vec!["*.json".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding the artifacts
    pub directory: PathBuf,
    /// Glob patterns, relative to `directory`, a file must match
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Compiler to keep running in watch mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<SideCommand>,
}

impl ArtifactsConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            include: default_include(),
            exclude: Vec::new(),
            command: None,
        }
    }
}

/// Reads artifacts and watches the directory they live in
#[derive(Debug, Clone)]
pub struct ArtifactsPlugin {
    source: Arc<ArtifactSource>,
}

#[derive(Debug)]
struct ArtifactSource {
    directory: PathBuf,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    command: Option<SideCommand>,
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| {
                Error::ConfigError(format!("Invalid artifact pattern `{pattern}`: {e}"))
            })
        })
        .collect()
}

impl ArtifactsPlugin {
    /// Relative paths in `config` resolve against `base_dir`
    pub fn new(config: ArtifactsConfig, base_dir: &Path) -> Result<Self> {
        let command = config.command.map(|mut command| {
            command.working_dir = Some(match command.working_dir.take() {
                Some(dir) => base_dir.join(dir),
                None => base_dir.to_path_buf(),
            });
            command
        });

        Ok(Self {
            source: Arc::new(ArtifactSource {
                directory: base_dir.join(config.directory),
                include: compile(&config.include)?,
                exclude: compile(&config.exclude)?,
                command,
            }),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.source.directory
    }
}

impl ArtifactSource {
    /// `path` relative to the artifact directory or to its canonical form
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        if let Ok(relative) = path.strip_prefix(&self.directory) {
            return Some(relative.to_path_buf());
        }
        let canonical = std::fs::canonicalize(&self.directory).ok()?;
        path.strip_prefix(canonical).ok().map(Path::to_path_buf)
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(relative) = self.relative(path) else {
            return false;
        };
        self.include.iter().any(|p| p.matches_path(&relative))
            && !self.exclude.iter().any(|p| p.matches_path(&relative))
    }

    fn contract_name(path: &Path) -> Option<String> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    fn parse(path: &Path, contents: &str) -> anyhow::Result<ContractDefinition> {
        let Some(name) = Self::contract_name(path) else {
            bail!("cannot derive a contract name from {}", path.display());
        };
        let value: Value = serde_json::from_str(contents)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        match value {
            Value::Array(_) => Ok(ContractDefinition::new(name, value)),
            Value::Object(mut object) => {
                let Some(abi) = object.remove("abi") else {
                    bail!("{} has no `abi` field", path.display());
                };
                let mut definition = ContractDefinition::new(name, abi);
                if let Some(address) = object.remove("address") {
                    let address: RawAddress = serde_json::from_value(address)
                        .with_context(|| format!("{} has a malformed `address`", path.display()))?;
                    definition = definition.with_address(address);
                }
                Ok(definition)
            }
            _ => bail!("{} holds neither an ABI nor an artifact", path.display()),
        }
    }

    async fn read(&self, path: &Path) -> anyhow::Result<Option<ContractDefinition>> {
        if !self.matches(path) || !path.is_file() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(path, &contents).map(Some)
    }

    fn scan(&self) -> anyhow::Result<Vec<ContractDefinition>> {
        let mut definitions = Vec::new();

        for entry in WalkDir::new(&self.directory)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.with_context(|| {
                format!("failed to scan {}", self.directory.display())
            })?;
            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let contents = std::fs::read_to_string(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            definitions.push(Self::parse(entry.path(), &contents)?);
        }

        debug!(
            "Found {} artifacts in {}",
            definitions.len(),
            self.directory.display()
        );
        Ok(definitions)
    }
}

#[async_trait]
impl Plugin for ArtifactsPlugin {
    fn name(&self) -> &str {
        ARTIFACTS_PLUGIN
    }

    async fn validate(&self) -> anyhow::Result<()> {
        let directory = &self.source.directory;
        match tokio::fs::metadata(directory).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => bail!("{} is not a directory", directory.display()),
            Err(e) => bail!("artifact directory {} is unavailable: {e}", directory.display()),
        }
    }

    async fn contracts(&self) -> anyhow::Result<Vec<ContractDefinition>> {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.scan())
            .await
            .context("artifact scan panicked")?
    }

    fn watch(&self) -> Option<Arc<dyn WatchDescriptor>> {
        Some(self.source.clone() as Arc<dyn WatchDescriptor>)
    }
}

#[async_trait]
impl WatchDescriptor for ArtifactSource {
    async fn paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        Ok(vec![self.directory.clone()])
    }

    async fn on_add(&self, path: &Path) -> anyhow::Result<Option<ContractDefinition>> {
        self.read(path).await
    }

    async fn on_change(&self, path: &Path) -> anyhow::Result<Option<ContractDefinition>> {
        self.read(path).await
    }

    async fn on_remove(&self, path: &Path) -> anyhow::Result<Option<String>> {
        if !self.matches(path) {
            return Ok(None);
        }
        Ok(Self::contract_name(path))
    }

    fn command(&self) -> Option<SideCommand> {
        self.command.clone()
    }
}

/// Registers [`ArtifactsPlugin`] under [`ARTIFACTS_PLUGIN`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactsFactory;

impl PluginFactory for ArtifactsFactory {
    fn name(&self) -> &str {
        ARTIFACTS_PLUGIN
    }

    fn build(&self, options: &Value, base_dir: &Path) -> Result<Arc<dyn Plugin>> {
        let config: ArtifactsConfig = serde_json::from_value(options.clone()).map_err(|e| {
            Error::ConfigError(format!("Invalid options for plugin `{ARTIFACTS_PLUGIN}`: {e}"))
        })?;
        Ok(Arc::new(ArtifactsPlugin::new(config, base_dir)?))
    }
}
