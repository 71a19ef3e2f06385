use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{generate_command, init_command};

/// Generate typed contract bindings from ABIs
#[derive(Parser, Debug)]
#[command(name = "contractgen")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the configured output targets
    #[command(visible_alias = "g")]
    Generate {
        /// Path to the config file (searched upwards from the root by default)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory to run from (defaults to current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Keep regenerating as watched files change
        #[arg(short, long)]
        watch: bool,
    },
    /// Initialize contractgen configuration
    Init {
        /// Custom working directory (defaults to current directory)
        #[arg(long = "cwd")]
        cwd: Option<String>,

        /// Force overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    /// Execute the command
    pub async fn execute(self) -> Result<()> {
        match self {
            Commands::Generate {
                config,
                root,
                watch,
            } => generate_command(config.as_deref(), root.as_deref(), watch).await,
            Commands::Init { cwd, force } => init_command(cwd.as_deref(), force),
        }
    }
}
