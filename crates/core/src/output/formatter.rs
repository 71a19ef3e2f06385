use crate::{
    command::SideCommand,
    error::{Error, Result},
};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Pretty-printer applied to the assembled artifact before it is persisted
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn format(&self, text: String, out: &Path) -> Result<String>;
}

/// Leaves the text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

#[async_trait]
impl Formatter for NoopFormatter {
    async fn format(&self, text: String, _out: &Path) -> Result<String> {
        Ok(text)
    }
}

/// Pipes the text through an external program's stdin and reads the result
/// from its stdout. `{out}` in the arguments is replaced by the artifact path.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    command: SideCommand,
}

impl CommandFormatter {
    pub fn new(command: SideCommand) -> Self {
        Self { command }
    }

    fn command_for(&self, out: &Path) -> SideCommand {
        let out = out.to_string_lossy();
        let mut command = self.command.clone();
        command.args = command
            .args
            .iter()
            .map(|arg| arg.replace("{out}", &out))
            .collect();
        command
    }
}

#[async_trait]
impl Formatter for CommandFormatter {
    async fn format(&self, text: String, out: &Path) -> Result<String> {
        let command = self.command_for(out);
        debug!("Formatting {} with `{}`", out.display(), command.to_shell_command());

        let format_error = |reason: String| Error::Format {
            out: out.to_path_buf(),
            reason,
        };

        let mut child = command
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format_error(format!("failed to start `{}`: {e}", command.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| format_error("formatter stdin unavailable".to_string()))?;
        // stdin is fed while stdout is being drained
        let feeder = tokio::spawn(async move {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format_error(e.to_string()))?;
        let fed = feeder.await.map_err(|e| format_error(e.to_string()))?;

        // a formatter that rejects its input may exit before reading all of it
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format_error(format!(
                "`{}` exited with {}: {}",
                command.to_shell_command(),
                output.status,
                stderr.trim()
            )));
        }
        fed.map_err(|e| format_error(format!("failed to write to formatter: {e}")))?;

        String::from_utf8(output.stdout)
            .map_err(|_| format_error("formatter produced invalid UTF-8".to_string()))
    }
}
