use anyhow::{Context, Result, bail};
use contractgen_core::{
    Config, Generator, PluginRegistry, TargetOutcome, WatchCoordinator, WatchHandle,
    config::CONFIG_FILE_NAMES,
};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub async fn generate_command(
    config: Option<&Path>,
    root: Option<&Path>,
    watch: bool,
) -> Result<()> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize root {}", root.display()))?;

    let config_path = match config {
        Some(path) => root.join(path),
        None => Config::find_config_file(&root).with_context(|| {
            format!(
                "No {} found in {} or any parent directory",
                CONFIG_FILE_NAMES.join(" or "),
                root.display()
            )
        })?,
    };
    let config_path = config_path
        .canonicalize()
        .with_context(|| format!("Config file {} not found", config_path.display()))?;
    info!("Using config {}", config_path.display());

    let config = Config::load_from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.clone());

    let registry = PluginRegistry::new();
    let targets = config.into_targets(&base_dir, &registry)?;
    let generator = config.generator(&base_dir);

    let outcomes = generator.generate_all(targets).await?;
    let failed = report(&outcomes, &base_dir);

    if watch {
        watch_targets(outcomes, &generator, &config, &base_dir).await?;
    }

    if failed > 0 {
        bail!("{} target(s) failed to generate", failed);
    }
    Ok(())
}

/// Print one line per target, returning how many failed
fn report(outcomes: &[TargetOutcome], base_dir: &Path) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        let out = display_path(&outcome.target.out, base_dir);
        match &outcome.result {
            Ok(contracts) => println!("✅ {} ({} contracts)", out.display(), contracts.len()),
            Err(e) => {
                failed += 1;
                println!("❌ {}: {}", out.display(), e);
            }
        }
    }
    failed
}

fn display_path(path: &Path, base_dir: &Path) -> PathBuf {
    path.strip_prefix(base_dir).unwrap_or(path).to_path_buf()
}

async fn watch_targets(
    outcomes: Vec<TargetOutcome>,
    generator: &Generator,
    config: &Config,
    base_dir: &Path,
) -> Result<()> {
    let mut handles: Vec<WatchHandle> = Vec::new();

    for outcome in outcomes {
        let Ok(contracts) = outcome.result else {
            warn!(
                "Not watching {}: initial generation failed",
                outcome.target.out.display()
            );
            continue;
        };

        let started = WatchCoordinator::new(outcome.target, contracts, generator.clone())
            .with_options(config.watch_options())
            .start()
            .await;
        match started {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                stop(handles, base_dir).await;
                return Err(e.into());
            }
        }
    }

    if handles.is_empty() {
        bail!("No target was generated successfully; nothing to watch");
    }

    println!(
        "👀 Watching {} target(s). Press Ctrl-C to stop.",
        handles.len()
    );
    wait_for_shutdown_signal().await?;
    println!("\n🛑 Shutting down");

    stop(handles, base_dir).await;
    Ok(())
}

async fn stop(handles: Vec<WatchHandle>, base_dir: &Path) {
    for handle in handles {
        let out = display_path(handle.out(), base_dir);
        match handle.shutdown().await {
            Ok(report) => info!(
                "Stopped {}: {} watcher(s) closed, {} command(s) terminated, {} regeneration(s)",
                out.display(),
                report.watchers_closed,
                report.commands_terminated,
                report.passes.completed
            ),
            Err(e) => warn!("Failed to stop watching {}: {}", out.display(), e),
        }
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    Ok(())
}
