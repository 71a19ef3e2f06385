//! Configuration loading and plugin registration

pub mod registry;
pub mod settings;

pub use registry::{PluginFactory, PluginRegistry};
pub use settings::{CONFIG_FILE_NAMES, Config, PluginConfig, TargetConfig};
