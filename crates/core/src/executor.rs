//! Ordered plugin execution and fragment composition

use crate::{
    error::{Error, Result},
    plugin::{Plugin, RunContext},
    types::Contract,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Fragments accumulated over one regeneration pass, in plugin order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginFragmentSet {
    pub imports: Vec<String>,
    pub prepend: Vec<String>,
    pub content: Vec<String>,
}

/// Banner that introduces a plugin's section in the artifact
pub fn plugin_banner(name: &str) -> String {
    let rule = "/".repeat(70);
    format!("{rule}\n// {name}\n{rule}")
}

/// Run every plugin's `run` capability in declared order.
///
/// The first failure aborts the pass; nothing partial is returned.
pub async fn execute(
    plugins: &[Arc<dyn Plugin>],
    contracts: &[Arc<Contract>],
    is_typescript: bool,
    out: &Path,
) -> Result<PluginFragmentSet> {
    let mut fragments = PluginFragmentSet::default();

    for plugin in plugins {
        let context = RunContext {
            contracts,
            is_typescript,
            out,
        };

        let output = plugin
            .run(context)
            .await
            .map_err(|source| Error::PluginExecution {
                plugin: plugin.name().to_string(),
                source,
            })?;

        let Some(output) = output.filter(|o| !o.is_empty()) else {
            debug!("Plugin {} contributed nothing", plugin.name());
            continue;
        };

        if let Some(imports) = output.imports {
            fragments.imports.push(imports);
        }
        if let Some(prepend) = output.prepend {
            fragments.prepend.push(prepend);
        }
        fragments.content.push(plugin_banner(plugin.name()));
        if let Some(content) = output.content {
            fragments.content.push(content);
        }
    }

    Ok(fragments)
}
