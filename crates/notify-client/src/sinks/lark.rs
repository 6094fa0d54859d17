//! Lark (Feishu) custom bot sink

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use serde::Serialize;
use watch_config::Config;

#[derive(Debug, Clone)]
pub struct LarkSink {
    http: HttpClient,
    instance: String,
}

#[derive(Debug, Serialize)]
struct LarkMessage {
    msg_type: &'static str,
    content: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    text: String,
}

impl LarkSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the webhook URL is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(&config.handler.lark.webhook_url)?,
            instance: config.instance_name.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for LarkSink {
    fn name(&self) -> &str {
        "lark"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let message = LarkMessage {
            msg_type: "text",
            content: TextContent {
                text: event.message(&self.instance),
            },
        };
        self.http.post_json(&message).await
    }
}
