//! Target-level orchestration of the generation pipeline
//!
//! A run checks every output target's uniqueness up front, then processes
//! each target independently: plugin validation, contract collection,
//! resolution into a [`ContractMap`] and one executor + writer pass.

use crate::{
    contract_map::ContractMap,
    error::{Error, Result},
    executor::execute,
    output::{Formatter, NoopFormatter, OutputWriter},
    plugin::Plugin,
    resolver::resolve,
    types::{Contract, ContractDefinition},
};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// One generated artifact and everything that feeds it
#[derive(Clone)]
pub struct OutputTarget {
    pub out: PathBuf,
    pub contracts: Vec<ContractDefinition>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl std::fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTarget")
            .field("out", &self.out)
            .field("contracts", &self.contracts.len())
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl OutputTarget {
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self {
            out: out.into(),
            contracts: Vec::new(),
            plugins: Vec::new(),
        }
    }

    pub fn with_contract(mut self, definition: ContractDefinition) -> Self {
        self.contracts.push(definition);
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// TypeScript output is selected by the artifact's extension
    pub fn is_typescript(&self) -> bool {
        matches!(
            self.out.extension().and_then(|e| e.to_str()),
            Some("ts" | "tsx" | "mts" | "cts")
        )
    }
}

/// Result of processing one target
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: OutputTarget,
    /// The resolved contracts on success, seeding watch mode
    pub result: Result<ContractMap>,
}

/// Lexically resolve `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Fail when two targets write to the same artifact
pub fn ensure_unique_outputs(targets: &[OutputTarget]) -> Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(normalize_path(&target.out)) {
            return Err(Error::DuplicateOutput(target.out.clone()));
        }
    }
    Ok(())
}

/// Fail when two definitions for one target share a name
pub fn ensure_unique_names(out: &Path, definitions: &[ContractDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for definition in definitions {
        if !seen.insert(definition.name.as_str()) {
            return Err(Error::DuplicateContract {
                name: definition.name.clone(),
                out: out.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Runs generation passes; cheap to clone and shared with watch sessions
#[derive(Debug, Clone)]
pub struct Generator {
    writer: OutputWriter,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(Arc::new(NoopFormatter))
    }
}

impl Generator {
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            writer: OutputWriter::new(formatter),
        }
    }

    /// Execute plugins over `contracts` and rewrite the artifact
    pub async fn run_pass(
        &self,
        plugins: &[Arc<dyn Plugin>],
        contracts: &[Arc<Contract>],
        out: &Path,
        is_typescript: bool,
    ) -> Result<()> {
        let fragments = execute(plugins, contracts, is_typescript, out).await?;
        self.writer.write(out, contracts, &fragments).await
    }

    /// Initial generation for one target
    pub async fn generate_target(&self, target: &OutputTarget) -> Result<ContractMap> {
        let is_typescript = target.is_typescript();
        debug!("Generating {:?}", target);

        for plugin in &target.plugins {
            plugin
                .validate()
                .await
                .map_err(|source| Error::PluginValidation {
                    plugin: plugin.name().to_string(),
                    source,
                })?;
        }

        let mut definitions = target.contracts.clone();
        for plugin in &target.plugins {
            let contributed =
                plugin
                    .contracts()
                    .await
                    .map_err(|source| Error::PluginContracts {
                        plugin: plugin.name().to_string(),
                        source,
                    })?;
            debug!(
                "Plugin {} contributed {} contracts",
                plugin.name(),
                contributed.len()
            );
            definitions.extend(contributed);
        }

        ensure_unique_names(&target.out, &definitions)?;

        let mut contracts = ContractMap::new();
        for definition in &definitions {
            let contract = resolve(definition, is_typescript)?;
            contracts
                .insert_new(contract)
                .map_err(|rejected| Error::DuplicateContract {
                    name: rejected.name,
                    out: target.out.clone(),
                })?;
        }

        self.run_pass(
            &target.plugins,
            &contracts.snapshot(),
            &target.out,
            is_typescript,
        )
        .await?;

        info!(
            "Generated {} with {} contracts",
            target.out.display(),
            contracts.len()
        );
        Ok(contracts)
    }

    /// Generate every target concurrently.
    ///
    /// Duplicate outputs fail the whole run before any target starts; after
    /// that each target succeeds or fails on its own. Outcomes keep the
    /// order of `targets`.
    pub async fn generate_all(&self, targets: Vec<OutputTarget>) -> Result<Vec<TargetOutcome>> {
        ensure_unique_outputs(&targets)?;

        let mut tasks = JoinSet::new();
        let mut indices = HashMap::with_capacity(targets.len());
        for (index, target) in targets.iter().cloned().enumerate() {
            let generator = self.clone();
            let handle = tasks.spawn(async move { generator.generate_target(&target).await });
            indices.insert(handle.id(), index);
        }

        let mut results: Vec<Option<Result<ContractMap>>> =
            std::iter::repeat_with(|| None).take(targets.len()).collect();
        while let Some(joined) = tasks.join_next_with_id().await {
            // a panicking target fails alone
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => (e.id(), Err(Error::Other(format!("target task failed: {e}")))),
            };
            if let Some(&index) = indices.get(&id) {
                results[index] = Some(result);
            }
        }

        Ok(targets
            .into_iter()
            .zip(results)
            .map(|(target, result)| TargetOutcome {
                target,
                result: result
                    .unwrap_or_else(|| Err(Error::Other("target task did not finish".to_string()))),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginOutput, RunContext};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn definition(name: &str) -> ContractDefinition {
        ContractDefinition::new(
            name,
            json!([{ "type": "event", "name": "Ping", "inputs": [], "anonymous": false }]),
        )
    }

    struct Supplier {
        contracts: Vec<ContractDefinition>,
    }

    #[async_trait]
    impl Plugin for Supplier {
        fn name(&self) -> &str {
            "Supplier"
        }

        async fn contracts(&self) -> anyhow::Result<Vec<ContractDefinition>> {
            Ok(self.contracts.clone())
        }

        async fn run(&self, context: RunContext<'_>) -> anyhow::Result<Option<PluginOutput>> {
            let names: Vec<&str> = context.contracts.iter().map(|c| c.name.as_str()).collect();
            Ok(Some(PluginOutput::content(format!(
                "export const names = {names:?}"
            ))))
        }
    }

    struct Rejecting {
        resolved: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Plugin for Rejecting {
        fn name(&self) -> &str {
            "Rejecting"
        }

        async fn validate(&self) -> anyhow::Result<()> {
            anyhow::bail!("required tool is not installed")
        }

        async fn contracts(&self) -> anyhow::Result<Vec<ContractDefinition>> {
            self.resolved.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_is_typescript() {
        assert!(OutputTarget::new("src/generated.ts").is_typescript());
        assert!(OutputTarget::new("src/generated.tsx").is_typescript());
        assert!(!OutputTarget::new("src/generated.js").is_typescript());
        assert!(!OutputTarget::new("generated").is_typescript());
    }

    #[tokio::test]
    async fn test_generate_target_merges_config_and_plugin_contracts() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("generated.ts");
        let target = OutputTarget::new(&out)
            .with_contract(definition("Config"))
            .with_plugin(Arc::new(Supplier {
                contracts: vec![definition("Plugin")],
            }));

        let contracts = Generator::default().generate_target(&target).await.unwrap();
        assert_eq!(contracts.names().collect::<Vec<_>>(), vec!["Config", "Plugin"]);

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("export const configABI"));
        assert!(written.contains("export const pluginABI"));
        assert!(written.contains(r#"export const names = ["Config", "Plugin"]"#));
    }

    #[tokio::test]
    async fn test_duplicate_contract_name_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("generated.ts");
        let target = OutputTarget::new(&out)
            .with_contract(definition("Token"))
            .with_plugin(Arc::new(Supplier {
                contracts: vec![definition("Token")],
            }));

        let err = Generator::default().generate_target(&target).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateContract { ref name, .. } if name == "Token"));
        assert!(err.is_configuration());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_validation_runs_before_contracts() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = Arc::new(AtomicBool::new(false));
        let target = OutputTarget::new(temp_dir.path().join("generated.ts"))
            .with_plugin(Arc::new(Rejecting {
                resolved: resolved.clone(),
            }));

        let err = Generator::default().generate_target(&target).await.unwrap_err();
        assert!(matches!(err, Error::PluginValidation { ref plugin, .. } if plugin == "Rejecting"));
        assert!(!resolved.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_duplicate_outputs_fail_before_any_target() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.ts");
        let shared = temp_dir.path().join("shared.ts");
        let targets = vec![
            OutputTarget::new(&first).with_contract(definition("A")),
            OutputTarget::new(&shared).with_contract(definition("B")),
            OutputTarget::new(&shared).with_contract(definition("C")),
        ];

        let err = Generator::default().generate_all(targets).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateOutput(ref path) if *path == shared));
        assert!(!first.exists());
        assert!(!shared.exists());
    }

    #[tokio::test]
    async fn test_targets_fail_independently() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.ts");
        let bad = temp_dir.path().join("bad.ts");
        let targets = vec![
            OutputTarget::new(&bad).with_contract(ContractDefinition::new("Bad", json!("nope"))),
            OutputTarget::new(&good).with_contract(definition("Good")),
        ];

        let outcomes = Generator::default().generate_all(targets).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].target.out, bad);
        assert!(matches!(outcomes[0].result, Err(Error::InvalidAbi { .. })));
        assert!(outcomes[1].result.is_ok());
        assert!(good.exists());
        assert!(!bad.exists());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("gen/../a.ts")), PathBuf::from("a.ts"));
        assert_eq!(normalize_path(Path::new("./src/./a.ts")), PathBuf::from("src/a.ts"));
        assert_eq!(normalize_path(Path::new("../a.ts")), PathBuf::from("../a.ts"));
        assert_eq!(normalize_path(Path::new("/../a.ts")), PathBuf::from("/a.ts"));
    }

    #[tokio::test]
    async fn test_equivalent_outputs_are_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let targets = vec![
            OutputTarget::new(temp_dir.path().join("a.ts")).with_contract(definition("A")),
            OutputTarget::new(temp_dir.path().join("gen/../a.ts")).with_contract(definition("B")),
        ];

        let err = Generator::default().generate_all(targets).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateOutput(_)));
        assert!(!temp_dir.path().join("a.ts").exists());
    }

    struct Panicking;

    #[async_trait]
    impl Plugin for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }

        async fn run(&self, _context: RunContext<'_>) -> anyhow::Result<Option<PluginOutput>> {
            panic!("plugin bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_target_fails_alone() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.ts");
        let broken = temp_dir.path().join("broken.ts");
        let targets = vec![
            OutputTarget::new(&broken).with_plugin(Arc::new(Panicking)),
            OutputTarget::new(&good).with_contract(definition("Good")),
        ];

        let outcomes = Generator::default().generate_all(targets).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].target.out, broken);
        assert!(matches!(outcomes[0].result, Err(Error::Other(_))));
        assert_eq!(outcomes[1].target.out, good);
        assert!(outcomes[1].result.is_ok());
        assert!(good.exists());
    }
}
