//! Microsoft Teams sink (legacy MessageCard format)

use crate::common::HttpClient;
use crate::error::SinkError;
use crate::models::{NotificationEvent, Status};
use crate::sink_trait::Sink;
use serde::Serialize;
use watch_config::Config;

const CARD_TITLE: &str = "kubewatch";
const CARD_SUMMARY: &str = "kubewatch notification received";

#[derive(Debug, Clone)]
pub struct MsTeamsSink {
    http: HttpClient,
    instance: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageCard {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    theme_color: &'static str,
    summary: &'static str,
    title: &'static str,
    text: String,
    sections: Vec<CardSection>,
}

#[derive(Debug, Serialize)]
struct CardSection {
    markdown: bool,
    facts: Vec<CardFact>,
}

#[derive(Debug, Serialize)]
struct CardFact {
    name: &'static str,
    value: String,
}

/// Card theme color for a status
#[must_use]
pub fn theme_color(status: Status) -> &'static str {
    match status {
        Status::Normal => "2DC72D",
        Status::Warning => "DEFF22",
        Status::Danger => "8C1A1A",
    }
}

impl MsTeamsSink {
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if the webhook URL is missing.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(&config.handler.msteams.webhook_url)?,
            instance: config.instance_name.clone(),
        })
    }

    fn card(&self, event: &NotificationEvent) -> MessageCard {
        let mut facts = vec![
            CardFact { name: "kind", value: event.kind.clone() },
            CardFact { name: "name", value: event.name.clone() },
        ];
        if !event.namespace.is_empty() {
            facts.push(CardFact { name: "namespace", value: event.namespace.clone() });
        }
        facts.push(CardFact { name: "reason", value: event.reason.to_string() });

        MessageCard {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            theme_color: theme_color(event.status),
            summary: CARD_SUMMARY,
            title: CARD_TITLE,
            text: event.message(&self.instance),
            sections: vec![CardSection { markdown: true, facts }],
        }
    }
}

#[async_trait::async_trait]
impl Sink for MsTeamsSink {
    fn name(&self) -> &str {
        "msteams"
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        self.http.post_json(&self.card(event)).await
    }
}
