//! Log sink

use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use tracing::info;
use watch_config::Config;

/// Writes each notification to the tracing log.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    instance: String,
}

impl LogSink {
    pub fn new(config: &Config) -> Self {
        Self {
            instance: config.instance_name.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        info!(
            kind = %event.kind,
            namespace = %event.namespace,
            name = %event.name,
            status = %event.status,
            "{}",
            event.message(&self.instance)
        );
        Ok(())
    }
}
