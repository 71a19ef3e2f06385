use std::io;
use std::path::PathBuf;

/// Errors that can occur during contractgen operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate output target: {}", .0.display())]
    DuplicateOutput(PathBuf),

    #[error("Duplicate contract name `{name}` for output target {}", .out.display())]
    DuplicateContract { name: String, out: PathBuf },

    #[error("Invalid ABI for contract `{contract}`:\n  {}", .violations.join("\n  "))]
    InvalidAbi {
        contract: String,
        violations: Vec<String>,
    },

    #[error("Invalid address for contract `{contract}`: {reason}")]
    InvalidAddress { contract: String, reason: String },

    #[error("Plugin `{plugin}` rejected the run: {source}")]
    PluginValidation {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Plugin `{plugin}` failed to supply contracts: {source}")]
    PluginContracts {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Plugin `{plugin}` failed: {source}")]
    PluginExecution {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Plugin `{plugin}` failed to set up watching: {source}")]
    WatchSetup {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to format {}: {reason}", .out.display())]
    Format { out: PathBuf, reason: String },

    #[error("Failed to write {}: {source}", .out.display())]
    Persistence {
        out: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error comes from configuration rather than from a plugin or the filesystem
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::DuplicateOutput(_) | Error::DuplicateContract { .. } | Error::ConfigError(_)
        )
    }
}

/// Result type alias for contractgen operations
pub type Result<T> = std::result::Result<T, Error>;
