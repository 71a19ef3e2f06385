use anyhow::{Context, Result};
use contractgen_core::config::CONFIG_FILE_NAMES;
use std::{env, fs, path::PathBuf};
use tracing::info;

use crate::config::templates::create_default_config;
use crate::config::workspace::Toolchain;

pub fn init_command(cwd: Option<&str>, force: bool) -> Result<()> {
    // Determine the project root
    let project_root = if let Some(cwd) = cwd {
        PathBuf::from(cwd)
    } else {
        env::current_dir().context("Failed to get current directory")?
    };

    let project_root = project_root
        .canonicalize()
        .context("Failed to canonicalize project root")?;

    let config_path = project_root.join(CONFIG_FILE_NAMES[0]);
    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    println!("🚀 Initializing contractgen in: {}", project_root.display());

    let toolchain = Toolchain::detect(&project_root);
    info!("Detected toolchain: {:?}", toolchain);
    println!("🔧 Reading artifacts from {}", toolchain.label());

    fs::write(&config_path, create_default_config(toolchain))
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Next steps:");
    println!(
        "   Build your contracts so that {} contains their artifacts",
        toolchain.artifacts_dir()
    );
    println!("   Run `contractgen generate` (add --watch to keep the output up to date)");

    Ok(())
}
