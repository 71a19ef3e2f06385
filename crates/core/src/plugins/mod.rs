//! Built-in plugins

pub mod artifacts;

pub use artifacts::{ARTIFACTS_PLUGIN, ArtifactsConfig, ArtifactsFactory, ArtifactsPlugin};
