//! Webex room sink

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use serde::Serialize;
use watch_config::Config;

/// Public Webex messages endpoint
pub const DEFAULT_WEBEX_URL: &str = "https://webexapis.com/v1/messages";

#[derive(Debug, Clone)]
pub struct WebexSink {
    http: HttpClient,
    room: String,
    instance: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebexMessage<'a> {
    room_id: &'a str,
    text: String,
}

impl WebexSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the token or room is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let settings = &config.handler.webex;
        if settings.token.is_empty() || settings.room.is_empty() {
            return Err(SinkError::InvalidConfig("missing webex token or room".to_string()));
        }
        let url = if settings.url.is_empty() { DEFAULT_WEBEX_URL } else { &settings.url };

        Ok(Self {
            http: HttpClient::new(url)?.with_bearer(&settings.token),
            room: settings.room.clone(),
            instance: config.instance_name.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for WebexSink {
    fn name(&self) -> &str {
        "webex"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let message = WebexMessage {
            room_id: &self.room,
            text: event.message(&self.instance),
        };
        self.http.post_json(&message).await
    }
}
