//! Generic JSON webhook sink

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use watch_config::Config;

/// Posts `{eventmeta, text, time}` to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: HttpClient,
    instance: String,
}

/// Wire payload
#[derive(Debug, Serialize)]
pub struct WebhookMessage<'a> {
    pub eventmeta: EventMeta<'a>,
    pub text: String,
    pub time: DateTime<Utc>,
}

/// Event metadata block
#[derive(Debug, Serialize)]
pub struct EventMeta<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
    pub reason: &'a str,
}

impl WebhookSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the URL is missing or the CA
    /// certificate cannot be loaded.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let settings = &config.handler.webhook;
        let cert = if settings.cert.is_empty() {
            debug!("No webhook cert is given");
            None
        } else {
            Some(Path::new(&settings.cert))
        };

        Ok(Self {
            http: HttpClient::with_tls(&settings.url, cert, settings.tls_skip)?,
            instance: config.instance_name.clone(),
        })
    }

    fn prepare<'a>(&self, event: &'a NotificationEvent) -> WebhookMessage<'a> {
        WebhookMessage {
            eventmeta: EventMeta {
                kind: &event.kind,
                name: &event.name,
                namespace: &event.namespace,
                reason: event.reason.as_str(),
            },
            text: event.message(&self.instance),
            time: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        self.http.post_json(&self.prepare(event)).await
    }
}
