use super::Formatter;
use crate::{
    error::{Error, Result},
    executor::PluginFragmentSet,
    types::Contract,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Assembles, formats and persists the generated artifact
#[derive(Clone)]
pub struct OutputWriter {
    formatter: Arc<dyn Formatter>,
}

impl std::fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputWriter").finish_non_exhaustive()
    }
}

impl OutputWriter {
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self { formatter }
    }

    /// Build the artifact text: banner, imports, prepend, contract constants
    /// in map order, then plugin sections.
    pub fn assemble(
        contracts: &[Arc<Contract>],
        fragments: &PluginFragmentSet,
        generated_at: DateTime<Utc>,
    ) -> String {
        let mut sections = vec![format!(
            "// Generated by contractgen v{} on {}",
            env!("CARGO_PKG_VERSION"),
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )];

        if !fragments.imports.is_empty() {
            sections.push(fragments.imports.join("\n"));
        }
        sections.extend(fragments.prepend.iter().cloned());
        sections.extend(contracts.iter().map(|c| c.content.trim_end().to_string()));
        sections.extend(fragments.content.iter().cloned());

        let mut text = sections.join("\n\n");
        text.push('\n');
        text
    }

    /// Regenerate the whole artifact at `out`.
    ///
    /// Either the previous file stays untouched or it is fully replaced.
    pub async fn write(
        &self,
        out: &Path,
        contracts: &[Arc<Contract>],
        fragments: &PluginFragmentSet,
    ) -> Result<()> {
        let text = Self::assemble(contracts, fragments, Utc::now());
        let text = self.formatter.format(text, out).await?;

        let destination = out.to_path_buf();
        let bytes = text.len();
        tokio::task::spawn_blocking(move || persist_atomically(&destination, &text))
            .await
            .map_err(|e| Error::Persistence {
                out: out.to_path_buf(),
                source: io::Error::other(e),
            })?
            .map_err(|source| Error::Persistence {
                out: out.to_path_buf(),
                source,
            })?;

        info!(
            "Wrote {} ({} contracts, {} bytes)",
            out.display(),
            contracts.len(),
            bytes
        );
        Ok(())
    }
}

fn persist_atomically(out: &Path, text: &str) -> io::Result<()> {
    let dir = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(out).map_err(|e| e.error)?;
    debug!("Replaced {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        output::NoopFormatter,
        resolver::resolve,
        types::{ContractDefinition, RawAddress},
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    struct RejectingFormatter;

    #[async_trait]
    impl Formatter for RejectingFormatter {
        async fn format(&self, _text: String, out: &Path) -> Result<String> {
            Err(Error::Format {
                out: out.to_path_buf(),
                reason: "syntax error".to_string(),
            })
        }
    }

    fn token() -> Arc<Contract> {
        let definition = ContractDefinition::new("Token", json!([]))
            .with_address(RawAddress::Single("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string()));
        Arc::new(resolve(&definition, true).unwrap())
    }

    #[test]
    fn test_assemble_order() {
        let fragments = PluginFragmentSet {
            imports: vec!["import a from 'a'".to_string(), "import b from 'b'".to_string()],
            prepend: vec!["const prelude = 1".to_string()],
            content: vec!["// plugin banner".to_string(), "export const x = 1".to_string()],
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let text = OutputWriter::assemble(&[token()], &fragments, at);

        assert!(text.starts_with(&format!(
            "// Generated by contractgen v{} on 2024-01-02T03:04:05Z\n\nimport a from 'a'\nimport b from 'b'\n\nconst prelude = 1\n\n",
            env!("CARGO_PKG_VERSION")
        )));
        let contract_at = text.find("export const tokenABI").unwrap();
        let plugin_at = text.find("// plugin banner").unwrap();
        assert!(text.find("const prelude").unwrap() < contract_at);
        assert!(contract_at < plugin_at);
        assert!(text.ends_with("export const x = 1\n"));
    }

    #[test]
    fn test_assemble_skips_empty_sections() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let text = OutputWriter::assemble(&[], &PluginFragmentSet::default(), at);
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("src/generated/contracts.ts");

        let writer = OutputWriter::new(Arc::new(NoopFormatter));
        writer
            .write(&out, &[token()], &PluginFragmentSet::default())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("export const tokenConfig"));
    }

    #[tokio::test]
    async fn test_format_failure_keeps_previous_file() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("generated.ts");
        std::fs::write(&out, "previous").unwrap();

        let writer = OutputWriter::new(Arc::new(RejectingFormatter));
        let err = writer
            .write(&out, &[token()], &PluginFragmentSet::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous");
        // No stray temporary files are left next to the artifact
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
