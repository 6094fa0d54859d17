//! Discord webhook sink

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::{NotificationEvent, Status};
use crate::sink_trait::Sink;
use serde::Serialize;
use watch_config::Config;

#[derive(Debug, Clone)]
pub struct DiscordSink {
    http: HttpClient,
    instance: String,
}

#[derive(Debug, Serialize)]
struct DiscordMessage {
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    color: u32,
    title: String,
}

/// Embed side-bar color for a status
#[must_use]
pub fn embed_color(status: Status) -> u32 {
    match status {
        Status::Normal => 8_311_585,
        Status::Warning => 16_312_092,
        Status::Danger => 13_632_027,
    }
}

impl DiscordSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the webhook URL is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(&config.handler.discord.webhook_url)?,
            instance: config.instance_name.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let message = DiscordMessage {
            embeds: vec![DiscordEmbed {
                color: embed_color(event.status),
                title: event.message(&self.instance),
            }],
        };
        self.http.post_json(&message).await
    }
}
