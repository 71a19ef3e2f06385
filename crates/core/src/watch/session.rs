//! The per-target watch loop
//!
//! A session exclusively owns its target's [`ContractMap`]. Events are
//! applied one at a time in arrival order; regeneration runs on a snapshot
//! in a separate task so events keep being applied while it writes.

use super::{
    debounce::Debounce,
    event::{FsEventKind, WatchEvent, WatchState},
};
use crate::{
    command::SideProcess,
    contract_map::ContractMap,
    error::Result,
    generate::Generator,
    plugin::{Plugin, WatchDescriptor},
    resolver::resolve,
    types::ContractDefinition,
};
use notify::RecommendedWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// A watch descriptor together with the plugin that declared it
#[derive(Clone)]
pub(crate) struct WatchSource {
    pub plugin: String,
    pub descriptor: Arc<dyn WatchDescriptor>,
}

/// Owned filesystem watchers; closing consumes the set
#[derive(Default)]
pub(crate) struct WatcherSet {
    watchers: Vec<RecommendedWatcher>,
}

impl WatcherSet {
    pub fn push(&mut self, watcher: RecommendedWatcher) {
        self.watchers.push(watcher);
    }

    /// Stop every watcher, returning how many were closed
    pub fn close(self) -> usize {
        let count = self.watchers.len();
        for watcher in self.watchers {
            drop(watcher);
        }
        count
    }
}

/// Regeneration passes completed by a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub completed: usize,
    pub failed: usize,
}

/// What a session released when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub watchers_closed: usize,
    pub commands_terminated: usize,
    pub passes: PassSummary,
}

pub(crate) struct Session {
    pub out: PathBuf,
    pub is_typescript: bool,
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub sources: Vec<WatchSource>,
    pub contracts: ContractMap,
    pub generator: Generator,
    pub debounce: Debounce,
    pub in_flight: Option<JoinHandle<Result<()>>>,
    /// A mutation arrived while a regeneration was in flight
    pub dirty: bool,
    pub state: watch::Sender<WatchState>,
    pub passes: watch::Sender<PassSummary>,
}

impl Session {
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<WatchEvent>,
        mut shutdown: oneshot::Receiver<()>,
        watchers: WatcherSet,
        commands: Vec<SideProcess>,
    ) -> ShutdownReport {
        self.set_state(WatchState::Watching);
        info!("Watching {} source(s) for {}", self.sources.len(), self.out.display());

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                joined = wait_in_flight(&mut self.in_flight) => self.finish_regeneration(joined),
                Some(event) = events.recv() => self.apply(event).await,
                () = self.debounce.expired(), if self.in_flight.is_none() => self.begin_regeneration(),
            }
        }

        self.shutdown(watchers, commands).await
    }

    async fn apply(&mut self, event: WatchEvent) {
        let Some(source) = self.sources.get(event.source).cloned() else {
            warn!("Dropping event from unknown watch source {}", event.source);
            return;
        };
        debug!("{:?} {} (plugin {})", event.kind, event.path.display(), source.plugin);

        let mutated = match event.kind {
            FsEventKind::Created | FsEventKind::Changed => {
                let definition = if event.kind == FsEventKind::Created {
                    source.descriptor.on_add(&event.path).await
                } else {
                    source.descriptor.on_change(&event.path).await
                };
                match definition {
                    Ok(Some(definition)) => self.replace(definition),
                    Ok(None) => false,
                    Err(e) => {
                        warn!(
                            "Plugin {} could not read {}: {:#}",
                            source.plugin,
                            event.path.display(),
                            e
                        );
                        false
                    }
                }
            }
            FsEventKind::Removed => match source.descriptor.on_remove(&event.path).await {
                Ok(Some(name)) => {
                    let removed = self.contracts.remove(&name).is_some();
                    if removed {
                        debug!("Removed contract {}", name);
                    }
                    removed
                }
                Ok(None) => false,
                Err(e) => {
                    warn!(
                        "Plugin {} could not handle removal of {}: {:#}",
                        source.plugin,
                        event.path.display(),
                        e
                    );
                    false
                }
            },
        };

        if mutated {
            self.schedule();
        }
    }

    fn replace(&mut self, definition: ContractDefinition) -> bool {
        match resolve(&definition, self.is_typescript) {
            Ok(contract) => {
                let name = contract.name.clone();
                match self.contracts.upsert(contract) {
                    Some(_) => debug!("Replaced contract {}", name),
                    None => debug!("Added contract {}", name),
                }
                true
            }
            Err(e) => {
                warn!("Ignoring update to {}: {}", definition.name, e);
                false
            }
        }
    }

    fn schedule(&mut self) {
        self.set_state(WatchState::Mutating);
        if self.in_flight.is_some() {
            self.dirty = true;
            self.set_state(WatchState::Regenerating);
        } else {
            self.debounce.restart();
            self.set_state(WatchState::DebouncePending);
        }
    }

    fn begin_regeneration(&mut self) {
        let snapshot = self.contracts.snapshot();
        let generator = self.generator.clone();
        let plugins = self.plugins.clone();
        let out = self.out.clone();
        let is_typescript = self.is_typescript;

        debug!("Regenerating {} with {} contracts", out.display(), snapshot.len());
        self.set_state(WatchState::Regenerating);
        self.in_flight = Some(tokio::spawn(async move {
            generator
                .run_pass(&plugins, &snapshot, &out, is_typescript)
                .await
        }));
    }

    fn finish_regeneration(&mut self, joined: std::result::Result<Result<()>, JoinError>) {
        self.in_flight = None;
        self.record(joined);

        if std::mem::take(&mut self.dirty) {
            self.debounce.restart();
            self.set_state(WatchState::DebouncePending);
        } else {
            self.set_state(WatchState::Watching);
        }
    }

    fn record(&mut self, joined: std::result::Result<Result<()>, JoinError>) {
        let succeeded = match joined {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Regenerating {} failed: {}", self.out.display(), e);
                false
            }
            Err(e) => {
                error!("Regeneration task for {} died: {}", self.out.display(), e);
                false
            }
        };

        self.passes.send_modify(|passes| {
            if succeeded {
                passes.completed += 1;
            } else {
                passes.failed += 1;
            }
        });
    }

    async fn shutdown(mut self, watchers: WatcherSet, commands: Vec<SideProcess>) -> ShutdownReport {
        self.set_state(WatchState::ShuttingDown);
        self.debounce.cancel();

        let watchers_closed = watchers.close();

        if let Some(in_flight) = self.in_flight.take() {
            debug!("Waiting for in-flight regeneration of {}", self.out.display());
            let joined = in_flight.await;
            self.record(joined);
        }

        let mut commands_terminated = 0;
        for command in commands {
            debug!("Stopping `{}`", command.label());
            command.terminate().await;
            commands_terminated += 1;
        }

        info!("Stopped watching {}", self.out.display());
        ShutdownReport {
            watchers_closed,
            commands_terminated,
            passes: *self.passes.borrow(),
        }
    }

    fn set_state(&self, state: WatchState) {
        self.state.send_replace(state);
    }
}

async fn wait_in_flight(
    in_flight: &mut Option<JoinHandle<Result<()>>>,
) -> std::result::Result<Result<()>, JoinError> {
    match in_flight.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
