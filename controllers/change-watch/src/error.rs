//! Controller-specific error types.
//!
//! Wraps the errors of the configuration, sink and Kubernetes layers and
//! adds the failures that only exist inside the controller: cache lookups,
//! initial sync and the watch/metrics plumbing.

use kube::Error as KubeError;
use notify_client::SinkError;
use thiserror::Error;
use watch_config::ConfigError;

/// Errors that can occur in the change-watch controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sink construction failed
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Cache lookup failed (e.g. malformed key); retried by the worker
    #[error("Cache lookup failed: {0}")]
    Cache(String),

    /// Initial cache sync failed or timed out; fatal for the kind
    #[error("Cache sync failed: {0}")]
    Sync(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Metrics/probe server could not bind or serve
    #[error("Metrics server error: {0}")]
    Server(#[from] std::io::Error),
}
