//! contractgen - Generate typed contract bindings from ABIs
//!
//! This crate provides functionality to:
//! - Validate contract definitions and render their ABI, address and config exports
//! - Run plugins that contribute contracts and source fragments
//! - Write one generated artifact per output target, atomically
//! - Keep artifacts up to date while watching the filesystem
pub mod command;
pub mod config;
pub mod contract_map;
pub mod error;
pub mod executor;
pub mod generate;
pub mod output;
pub mod plugin;
pub mod plugins;
pub mod resolver;
pub mod types;
pub mod watch;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use command::{SideCommand, SideProcess};
pub use config::{Config, PluginFactory, PluginRegistry};
pub use contract_map::ContractMap;
pub use executor::{PluginFragmentSet, execute};
pub use generate::{Generator, OutputTarget, TargetOutcome};
pub use output::{CommandFormatter, Formatter, NoopFormatter, OutputWriter};
pub use plugin::{Plugin, PluginOutput, RunContext, WatchDescriptor};
pub use resolver::resolve;
pub use watch::{ShutdownReport, WatchCoordinator, WatchHandle, WatchOptions, WatchState};
