//! Notification sinks

pub mod cloudevent;
pub mod discord;
pub mod lark;
pub mod log;
pub mod msteams;
pub mod slack;
pub mod webex;
pub mod webhook;

pub use cloudevent::CloudEventSink;
pub use discord::DiscordSink;
pub use lark::LarkSink;
pub use log::LogSink;
pub use msteams::MsTeamsSink;
pub use slack::SlackWebhookSink;
pub use webex::WebexSink;
pub use webhook::WebhookSink;

use crate::error::SinkError;
use crate::sink_trait::Sink;
use tracing::info;
use watch_config::Config;

/// Builds every sink whose required setting is present, in a fixed order.
/// Falls back to a single [`LogSink`] when none is configured.
///
/// # Errors
///
/// Returns the first sink construction error; a misconfigured sink is fatal.
pub fn build_sinks(config: &Config) -> Result<Vec<Box<dyn Sink>>, SinkError> {
    let handler = &config.handler;
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();

    if !handler.webhook.url.is_empty() {
        sinks.push(Box::new(WebhookSink::new(config)?));
    }
    if !handler.slack_webhook.url.is_empty() {
        sinks.push(Box::new(SlackWebhookSink::new(config)?));
    }
    if !handler.discord.webhook_url.is_empty() {
        sinks.push(Box::new(DiscordSink::new(config)?));
    }
    if !handler.msteams.webhook_url.is_empty() {
        sinks.push(Box::new(MsTeamsSink::new(config)?));
    }
    if !handler.lark.webhook_url.is_empty() {
        sinks.push(Box::new(LarkSink::new(config)?));
    }
    if !handler.cloudevent.url.is_empty() {
        sinks.push(Box::new(CloudEventSink::new(config)?));
    }
    if !handler.webex.token.is_empty() || !handler.webex.room.is_empty() {
        sinks.push(Box::new(WebexSink::new(config)?));
    }

    if sinks.is_empty() {
        sinks.push(Box::new(LogSink::new(config)));
    }

    let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
    info!("Configured sinks: {}", names.join(", "));
    Ok(sinks)
}
