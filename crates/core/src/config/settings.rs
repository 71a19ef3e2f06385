use crate::{
    command::SideCommand,
    error::{Error, Result},
    generate::{Generator, OutputTarget},
    output::{CommandFormatter, Formatter, NoopFormatter},
    types::ContractDefinition,
    watch::WatchOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::PluginRegistry;

/// File names searched for, in order, in each directory
pub const CONFIG_FILE_NAMES: [&str; 2] = ["contractgen.json", ".contractgen.json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Watch mode quiet period in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<SideCommand>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub out: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<ContractDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Checks that need no filesystem access
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::ConfigError(
                "No output targets configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.out.as_os_str().is_empty() {
                return Err(Error::ConfigError(
                    "Output target with an empty `out` path".to_string(),
                ));
            }
            if !seen.insert(crate::generate::normalize_path(&target.out)) {
                return Err(Error::DuplicateOutput(target.out.clone()));
            }
            for plugin in &target.plugins {
                if plugin.name.trim().is_empty() {
                    return Err(Error::ConfigError(format!(
                        "Plugin without a name for {}",
                        target.out.display()
                    )));
                }
            }
        }

        if self.debounce_ms == Some(0) {
            return Err(Error::ConfigError(
                "`debounce_ms` must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the output targets, resolving relative paths against `base_dir`
    pub fn into_targets(
        &self,
        base_dir: &Path,
        registry: &PluginRegistry,
    ) -> Result<Vec<OutputTarget>> {
        self.validate()?;

        self.targets
            .iter()
            .map(|target| {
                let mut output = OutputTarget::new(base_dir.join(&target.out));
                output.contracts = target.contracts.clone();
                for plugin in &target.plugins {
                    output.plugins.push(registry.build(plugin, base_dir)?);
                }
                Ok::<_, Error>(output)
            })
            .collect()
    }

    /// The configured formatter; runs in `base_dir` unless it sets its own
    /// working directory
    pub fn formatter(&self, base_dir: &Path) -> Arc<dyn Formatter> {
        match &self.formatter {
            Some(command) => {
                let mut command = command.clone();
                command.working_dir = Some(match command.working_dir.take() {
                    Some(dir) => base_dir.join(dir),
                    None => base_dir.to_path_buf(),
                });
                Arc::new(CommandFormatter::new(command))
            }
            None => Arc::new(NoopFormatter),
        }
    }

    pub fn generator(&self, base_dir: &Path) -> Generator {
        Generator::new(self.formatter(base_dir))
    }

    pub fn watch_options(&self) -> WatchOptions {
        match self.debounce_ms {
            Some(ms) => WatchOptions {
                debounce: Duration::from_millis(ms),
            },
            None => WatchOptions::default(),
        }
    }
}
