//! Slack incoming webhook sink

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use serde::Serialize;
use watch_config::Config;

#[derive(Debug, Clone)]
pub struct SlackWebhookSink {
    http: HttpClient,
    channel: String,
    username: String,
    emoji: String,
    instance: String,
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    #[serde(skip_serializing_if = "is_blank")]
    channel: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    username: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    icon_emoji: &'a str,
    text: String,
}

fn is_blank(value: &&str) -> bool {
    value.is_empty()
}

impl SlackWebhookSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the webhook URL is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let settings = &config.handler.slack_webhook;
        Ok(Self {
            http: HttpClient::new(&settings.url)?,
            channel: settings.channel.clone(),
            username: settings.username.clone(),
            emoji: settings.emoji.clone(),
            instance: config.instance_name.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for SlackWebhookSink {
    fn name(&self) -> &str {
        "slackwebhook"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let message = SlackMessage {
            channel: &self.channel,
            username: &self.username,
            icon_emoji: &self.emoji,
            text: event.message(&self.instance),
        };
        self.http.post_json(&message).await
    }
}
