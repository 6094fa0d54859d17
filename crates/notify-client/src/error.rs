//! Sink errors

use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Receiver answered with a non-success status
    #[error("Sink API error: {0}")]
    Api(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sink is missing a required setting or has an unusable one
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),
}
