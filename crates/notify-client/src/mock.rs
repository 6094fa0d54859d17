//! Mock sink for unit testing
//!
//! Records every handled notification in memory and can be told to fail,
//! so controller tests can assert on dispatch without any receiver.

use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use std::sync::{Arc, Mutex};

/// Recording sink. Clones share the same event log.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MockSink {
    /// Create a new mock sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `handle` call fail with `SinkError::Api(message)`
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    /// Events handled so far, in order (failed deliveries included)
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of events handled so far
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// True when nothing has been handled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(SinkError::Api(message.clone())),
            None => Ok(()),
        }
    }
}
