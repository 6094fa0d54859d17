//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A kind referenced by configuration is not in the registry
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    /// A custom resource descriptor is incomplete
    #[error("Invalid custom resource: {0}")]
    InvalidCustomResource(String),
}
