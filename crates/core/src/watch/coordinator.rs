//! Watch mode setup and the handle used to stop it
//!
//! [`WatchCoordinator::start`] opens one filesystem watcher per watch
//! descriptor of a target, starts any side commands and hands everything to
//! a session task. Events from all watchers of a target funnel into one
//! channel, so contract map mutations are serialized per target.

use super::{
    debounce::Debounce,
    event::{DEBOUNCE_MS, FsEventKind, WatchEvent, WatchState},
    session::{PassSummary, Session, ShutdownReport, WatchSource, WatcherSet},
};
use crate::{
    command::SideProcess,
    contract_map::ContractMap,
    error::{Error, Result},
    generate::{Generator, OutputTarget},
};
use anyhow::Context;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period after the last mutation before regenerating
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEBOUNCE_MS),
        }
    }
}

/// Keeps one output target's artifact in sync with the filesystem
pub struct WatchCoordinator {
    target: OutputTarget,
    contracts: ContractMap,
    generator: Generator,
    options: WatchOptions,
}

impl WatchCoordinator {
    /// `contracts` is the map produced by the target's initial generation
    pub fn new(target: OutputTarget, contracts: ContractMap, generator: Generator) -> Self {
        Self {
            target,
            contracts,
            generator,
            options: WatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Watch descriptors of the target's plugins, in plugin order
    pub(crate) fn sources(&self) -> Vec<WatchSource> {
        self.target
            .plugins
            .iter()
            .filter_map(|plugin| {
                plugin.watch().map(|descriptor| WatchSource {
                    plugin: plugin.name().to_string(),
                    descriptor,
                })
            })
            .collect()
    }

    /// Open watchers, start side commands and begin reacting to events.
    ///
    /// A failure here drops everything opened so far, which stops the
    /// watchers and kills started side commands.
    pub async fn start(self) -> Result<WatchHandle> {
        let sources = self.sources();
        let (events, rx) = mpsc::unbounded_channel();
        let mut watchers = WatcherSet::default();
        let mut commands = Vec::new();

        for (index, source) in sources.iter().enumerate() {
            let paths = source
                .descriptor
                .paths()
                .await
                .map_err(|e| Error::WatchSetup {
                    plugin: source.plugin.clone(),
                    source: e,
                })?;

            let watcher =
                spawn_watcher(index, &paths, events.clone()).map_err(|e| Error::WatchSetup {
                    plugin: source.plugin.clone(),
                    source: anyhow::Error::new(e).context("failed to open watcher"),
                })?;
            watchers.push(watcher);

            if let Some(command) = source.descriptor.command() {
                info!(
                    "Starting `{}` for plugin {}",
                    command.to_shell_command(),
                    source.plugin
                );
                let process = command
                    .spawn()
                    .with_context(|| format!("failed to start `{}`", command.to_shell_command()))
                    .map_err(|e| Error::WatchSetup {
                        plugin: source.plugin.clone(),
                        source: e,
                    })?;
                commands.push(process);
            }
        }

        if sources.is_empty() {
            info!(
                "No plugin of {} declares watch paths; waiting for shutdown",
                self.target.out.display()
            );
        }

        Ok(self.spawn_session(sources, rx, watchers, commands))
    }

    pub(crate) fn spawn_session(
        self,
        sources: Vec<WatchSource>,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        watchers: WatcherSet,
        commands: Vec<SideProcess>,
    ) -> WatchHandle {
        let out = self.target.out.clone();
        let (state_tx, state_rx) = watch::channel(WatchState::Idle);
        let (passes_tx, passes_rx) = watch::channel(PassSummary::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let session = Session {
            out: self.target.out.clone(),
            is_typescript: self.target.is_typescript(),
            plugins: self.target.plugins,
            sources,
            contracts: self.contracts,
            generator: self.generator,
            debounce: Debounce::new(self.options.debounce),
            in_flight: None,
            dirty: false,
            state: state_tx,
            passes: passes_tx,
        };

        let task = tokio::spawn(session.run(events, shutdown_rx, watchers, commands));

        WatchHandle {
            out,
            shutdown: Some(shutdown_tx),
            task,
            state: state_rx,
            passes: passes_rx,
        }
    }
}

/// Create a watcher over `paths` that forwards filtered events tagged with
/// `source`.
///
/// A path that does not exist yet is watched through its nearest existing
/// ancestor. Only events under one of `paths` are forwarded.
pub(crate) fn spawn_watcher(
    source: usize,
    paths: &[PathBuf],
    events: mpsc::UnboundedSender<WatchEvent>,
) -> notify::Result<RecommendedWatcher> {
    let mut watched = Vec::new();
    let mut roots = Vec::new();
    for path in paths {
        let Some(existing) = nearest_existing(path) else {
            warn!("Not watching {}: no existing ancestor", path.display());
            continue;
        };
        if existing != *path {
            warn!(
                "{} does not exist yet; watching {} for it",
                path.display(),
                existing.display()
            );
        }
        // backends may report events under the canonical path
        if let (Ok(canonical), Ok(rest)) = (existing.canonicalize(), path.strip_prefix(&existing)) {
            roots.push(canonical.join(rest));
        }
        if let Ok(rest) = path.strip_prefix(&existing) {
            roots.push(existing.join(rest));
        }
        roots.push(path.clone());
        watched.push(existing);
    }

    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                for path in event.paths {
                    if !roots.iter().any(|root| path.starts_with(root)) {
                        continue;
                    }
                    let Some(kind) = FsEventKind::classify(&event.kind, &path) else {
                        continue;
                    };
                    // the receiver is gone once the session has stopped
                    let _ = events.send(WatchEvent { source, kind, path });
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        })?;

    for path in &watched {
        debug!("Watching {}", path.display());
        watcher.watch(path, RecursiveMode::Recursive)?;
    }

    Ok(watcher)
}

/// `path` itself when it exists, else its closest existing ancestor
fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .map(|ancestor| {
            if ancestor.as_os_str().is_empty() {
                Path::new(".")
            } else {
                ancestor
            }
        })
        .find(|ancestor| ancestor.exists())
        .map(Path::to_path_buf)
}

/// Handle to a running watch session
pub struct WatchHandle {
    out: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<ShutdownReport>,
    state: watch::Receiver<WatchState>,
    passes: watch::Receiver<PassSummary>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("out", &self.out)
            .field("state", &self.state())
            .finish()
    }
}

impl WatchHandle {
    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Follow state transitions
    pub fn states(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Follow completed and failed regeneration passes
    pub fn passes(&self) -> watch::Receiver<PassSummary> {
        self.passes.clone()
    }

    /// Stop the session: cancel any pending debounce, close every watcher,
    /// let an in-flight regeneration finish and terminate side commands.
    pub async fn shutdown(mut self) -> Result<ShutdownReport> {
        if let Some(shutdown) = self.shutdown.take() {
            // an error means the session already stopped
            let _ = shutdown.send(());
        }

        let out = self.out.clone();
        self.task
            .await
            .map_err(|e| Error::Other(format!("watch session for {} failed: {e}", out.display())))
    }
}
