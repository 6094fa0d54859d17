//! Sink trait
//!
//! The controller only depends on this capability; concrete sinks and the
//! test mock implement it.

use crate::error::SinkError;
use crate::models::NotificationEvent;

/// A notification destination.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Delivers one notification. Called at most once per event; failures
    /// are logged by the caller and never retried.
    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError>;
}
