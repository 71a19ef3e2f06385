use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// An external process a watch descriptor asks to run alongside the watcher,
/// e.g. a compiler in its own watch mode. Also used to describe formatter
/// invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl SideCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn to_shell_command(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            cmd.push(' ');
            if arg.contains(' ') {
                cmd.push_str(&format!("'{arg}'"));
            } else {
                cmd.push_str(arg);
            }
        }
        cmd
    }

    /// Build the tokio command. The child is killed if its handle is dropped.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env {
            debug!("Setting env: {}={}", key, value);
            cmd.env(key, value);
        }

        cmd
    }

    /// Start the command as a background process with inherited stdio
    pub fn spawn(&self) -> io::Result<SideProcess> {
        let child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        debug!("Started side command: {}", self.to_shell_command());
        Ok(SideProcess {
            label: self.to_shell_command(),
            child,
        })
    }
}

/// A running side command, terminated explicitly on shutdown
#[derive(Debug)]
pub struct SideProcess {
    label: String,
    child: Child,
}

impl SideProcess {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Kill the process if still running and reap it
    pub async fn terminate(mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Side command `{}` already exited with {}", self.label, status);
            }
            Ok(None) => {
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to stop side command `{}`: {}", self.label, e);
                }
            }
            Err(e) => warn!("Failed to poll side command `{}`: {}", self.label, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_shell_command_quotes_spaces() {
        let cmd = SideCommand::new("forge").with_args(["build", "--watch", "src dir"]);
        assert_eq!(cmd.to_shell_command(), "forge build --watch 'src dir'");
    }

    #[test]
    fn test_deserialize_defaults() {
        let cmd: SideCommand = serde_json::from_str(r#"{ "program": "prettier" }"#).unwrap();
        assert_eq!(cmd, SideCommand::new("prettier"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_terminate() {
        let process = SideCommand::new("sleep").with_args(["30"]).spawn().unwrap();
        assert_eq!(process.label(), "sleep 30");
        process.terminate().await;
    }
}
