//! CloudEvents sink
//!
//! Sends each notification as a structured-mode CloudEvent 1.0 JSON document.
//! Event ids are `<process start unix seconds>-<sequence>`.

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::NotificationEvent;
use crate::sink_trait::Sink;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use watch_config::Config;

/// CloudEvent `type` attribute
pub const EVENT_TYPE: &str = "KUBERNETES_TOPOLOGY_CHANGE";
/// CloudEvent `source` attribute
pub const EVENT_SOURCE: &str = "https://github.com/robusta-dev/kubewatch";
const CONTENT_TYPE: &str = "application/cloudevents+json";

#[derive(Debug)]
pub struct CloudEventSink {
    http: HttpClient,
    instance: String,
    start_time: i64,
    counter: AtomicU64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
struct CloudEvent<'a> {
    specversion: &'static str,
    id: String,
    source: &'static str,
    #[serde(rename = "type")]
    event_type: &'static str,
    time: DateTime<Utc>,
    datacontenttype: &'static str,
    data: CloudEventData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudEventData<'a> {
    operation: &'static str,
    kind: &'a str,
    cluster_uid: &'a str,
    description: String,
    api_version: &'a str,
    obj: Option<&'a serde_json::Value>,
    old_obj: Option<&'a serde_json::Value>,
}

impl CloudEventSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the receiver URL is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(&config.handler.cloudevent.url)?,
            instance: config.instance_name.clone(),
            start_time: Utc::now().timestamp(),
            counter: AtomicU64::new(0),
        })
    }

    fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.start_time, seq)
    }
}

#[async_trait::async_trait]
impl Sink for CloudEventSink {
    fn name(&self) -> &str {
        "cloudevent"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let cloud_event = CloudEvent {
            specversion: "1.0",
            id: self.next_id(),
            source: EVENT_SOURCE,
            event_type: EVENT_TYPE,
            time: Utc::now(),
            datacontenttype: "application/json",
            data: CloudEventData {
                operation: event.reason.operation(),
                kind: &event.kind,
                cluster_uid: &self.instance,
                description: event.message(&self.instance),
                api_version: &event.api_version,
                obj: event.obj.as_ref(),
                old_obj: event.old_obj.as_ref(),
            },
        };
        self.http.post_with_content_type(&cloud_event, CONTENT_TYPE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut config = Config::default();
        config.handler.cloudevent.url = "http://ce.local/".to_string();
        let sink = CloudEventSink::new(&config).unwrap();

        let first = sink.next_id();
        let second = sink.next_id();
        assert_eq!(first, format!("{}-1", sink.start_time));
        assert_eq!(second, format!("{}-2", sink.start_time));
    }
}
