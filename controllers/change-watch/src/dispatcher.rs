//! Fan-out of finished notifications to the configured sinks.

use notify_client::{NotificationEvent, Sink};
use tracing::{debug, error};

/// Delivers each notification once to every sink, in order.
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Sends `event` to every sink. Failures are logged with `key` and
    /// discarded; delivery is never retried.
    pub async fn dispatch(&self, event: &NotificationEvent, key: &str) {
        for sink in &self.sinks {
            match sink.handle(event).await {
                Ok(()) => debug!(key, kind = %event.kind, sink = sink.name(), "Delivered notification"),
                Err(e) => error!(key, kind = %event.kind, sink = sink.name(), "Failed to deliver notification: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Dispatcher").field("sinks", &names).finish()
    }
}
