//! Configuration document
//!
//! Loaded from `$KW_CONFIG/.kubewatch.yaml` (falling back to
//! `$HOME/.kubewatch.yaml`). Environment variables fill any value the file
//! leaves empty, so the controller can be configured entirely from a pod
//! spec.

use crate::error::ConfigError;
use crate::ignored_fields::IgnoredFields;
use crate::registry::{self, WatchedKind, BUILTIN_KINDS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = ".kubewatch.yaml";

/// Default address of the metrics/probe endpoint
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:2112";

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Notification sink settings
    pub handler: HandlerConfig,

    /// Enabled built-in kinds keyed by registry id (`po: true`)
    pub resource: BTreeMap<String, bool>,

    /// Additional kinds identified by group/version/resource
    pub custom_resources: Vec<CustomResource>,

    /// Namespace to watch; empty watches all namespaces.
    /// Ignored for cluster-scoped kinds.
    pub namespace: String,

    /// Name of this controller instance, shown in every message
    pub instance_name: String,

    /// Update-diff settings
    pub diff: DiffConfig,

    /// Metrics/probe listen address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,

    /// Upper bound on the initial cache sync of each kind; unset waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_timeout_seconds: Option<u64>,
}

/// Update-diff settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffConfig {
    /// Dotted paths ignored for every kind (`metadata.resourceVersion`)
    pub ignore: Vec<String>,

    /// Tree form of ignored paths applied to every kind
    pub ignored_fields: IgnoredFields,

    /// Additional ignored paths per kind display name
    pub ignored_fields_by_kind: BTreeMap<String, IgnoredFields>,
}

/// Custom resource descriptor (group, version, resource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResource {
    /// API group (empty for the core group)
    #[serde(default)]
    pub group: String,

    /// API version
    pub version: String,

    /// Plural resource name
    pub resource: String,

    /// Display name; defaults to the resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Whether the resource is namespaced
    #[serde(default = "default_true")]
    pub namespaced: bool,
}

fn default_true() -> bool {
    true
}

/// Notification sink settings. Every sink whose required setting is
/// present is enabled; with none configured events are only logged.
///
/// The lowercase keys of older `.kubewatch.yaml` files (`slackwebhook`,
/// `webhookurl`, `tlsskip`, ...) are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerConfig {
    pub webhook: WebhookConfig,
    #[serde(alias = "slackwebhook")]
    pub slack_webhook: SlackWebhookConfig,
    pub discord: DiscordConfig,
    pub msteams: MsTeamsConfig,
    pub lark: LarkConfig,
    pub cloudevent: CloudEventConfig,
    pub webex: WebexConfig,
}

/// Generic JSON webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    pub url: String,
    /// PEM CA certificate path for self-signed endpoints
    pub cert: String,
    /// Skip TLS certificate verification
    #[serde(alias = "tlsskip")]
    pub tls_skip: bool,
}

/// Slack incoming webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackWebhookConfig {
    #[serde(alias = "slackwebhookurl")]
    pub url: String,
    pub channel: String,
    pub username: String,
    pub emoji: String,
}

/// Discord webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    #[serde(alias = "webhookurl")]
    pub webhook_url: String,
}

/// Microsoft Teams incoming webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MsTeamsConfig {
    #[serde(alias = "webhookurl")]
    pub webhook_url: String,
}

/// Lark (Feishu) custom bot webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LarkConfig {
    #[serde(alias = "webhookurl")]
    pub webhook_url: String,
}

/// CloudEvents HTTP receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudEventConfig {
    pub url: String,
}

/// Webex messages API. Enabled by a token or room; both are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebexConfig {
    pub token: String,
    pub room: String,
    /// Messages endpoint; defaults to the public Webex API
    pub url: String,
}

impl Config {
    /// Loads configuration from the default location, applies environment
    /// overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = Self::from_path(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Returns `$KW_CONFIG/.kubewatch.yaml`, else `$HOME/.kubewatch.yaml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let dir = std::env::var("KW_CONFIG")
            .or_else(|_| std::env::var("HOME"))
            .unwrap_or_else(|_| ".".to_string());
        Path::new(&dir).join(CONFIG_FILE_NAME)
    }

    /// Reads a config file. A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` on read failures other than "not found",
    /// and `ConfigError::Parse` on invalid YAML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                info!("Loading configuration from {}", path.display());
                Self::from_yaml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses a YAML document. Blank input yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on invalid YAML.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fills unset values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Fills unset values from `lookup`. File values always win.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        for desc in BUILTIN_KINDS {
            let enabled = self.resource.get(desc.id).copied().unwrap_or(false);
            if !enabled && get(desc.env).is_some_and(|v| v.eq_ignore_ascii_case("true")) {
                debug!("Enabling {} from {}", desc.name, desc.env);
                self.resource.insert(desc.id.to_string(), true);
            }
        }

        fill(&mut self.namespace, get("WATCH_NAMESPACE"));
        fill(&mut self.instance_name, get("KUBEWATCH_NAME"));
        if self.listen_address.is_none() {
            self.listen_address = get("LISTEN_ADDRESS");
        }

        let handler = &mut self.handler;
        fill(&mut handler.webhook.url, get("KW_WEBHOOK_URL"));
        fill(&mut handler.webhook.cert, get("KW_WEBHOOK_CERT"));
        fill(&mut handler.slack_webhook.url, get("KW_SLACK_WEBHOOK_URL"));
        fill(&mut handler.discord.webhook_url, get("KW_DISCORD_WEBHOOKURL"));
        fill(&mut handler.msteams.webhook_url, get("KW_MSTEAMS_WEBHOOKURL"));
        fill(&mut handler.lark.webhook_url, get("KW_LARK_WEBHOOK_URL"));
        fill(&mut handler.cloudevent.url, get("KW_CLOUDEVENT_URL"));
        fill(&mut handler.webex.token, get("WEBEX_ACCESS_TOKEN"));
        fill(&mut handler.webex.room, get("WEBEX_ROOM"));
        fill(&mut handler.webex.url, get("WEBEX_URL"));
    }

    /// Checks resource ids and custom resource descriptors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKind` for a resource id not in the
    /// registry and `ConfigError::InvalidCustomResource` for an incomplete
    /// descriptor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(unknown) = self.resource.keys().find(|id| registry::lookup(id).is_none()) {
            return Err(ConfigError::UnknownKind(unknown.clone()));
        }
        for crd in &self.custom_resources {
            WatchedKind::custom(crd, None, IgnoredFields::new())?;
        }
        Ok(())
    }

    /// Namespace filter; `None` when all namespaces are watched.
    #[must_use]
    pub fn namespace_filter(&self) -> Option<String> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(self.namespace.clone())
        }
    }

    /// Effective metrics listen address.
    #[must_use]
    pub fn metrics_address(&self) -> &str {
        self.listen_address.as_deref().unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }

    /// Effective ignored field tree for a kind display name: the global tree,
    /// the dotted `diff.ignore` paths and the kind-specific tree merged.
    #[must_use]
    pub fn ignored_fields_for(&self, kind: &str) -> IgnoredFields {
        let mut tree = self.diff.ignored_fields.merged(&IgnoredFields::from_paths(&self.diff.ignore));
        if let Some(specific) = self.diff.ignored_fields_by_kind.get(kind) {
            tree.merge(specific);
        }
        tree
    }

    /// Resolves every enabled built-in kind and custom resource, in
    /// registry order followed by custom resources in file order.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Config::validate`].
    pub fn watched_kinds(&self) -> Result<Vec<WatchedKind>, ConfigError> {
        self.validate()?;
        let namespace = self.namespace_filter();

        let mut kinds: Vec<WatchedKind> = BUILTIN_KINDS
            .iter()
            .filter(|desc| self.resource.get(desc.id).copied().unwrap_or(false))
            .map(|desc| WatchedKind::builtin(desc, namespace.clone(), self.ignored_fields_for(desc.name)))
            .collect();

        for crd in &self.custom_resources {
            let name = crd.kind.as_deref().unwrap_or(&crd.resource);
            kinds.push(WatchedKind::custom(crd, namespace.clone(), self.ignored_fields_for(name))?);
        }
        Ok(kinds)
    }
}

fn fill(target: &mut String, value: Option<String>) {
    if target.is_empty() {
        if let Some(value) = value {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
handler:
  webhook:
    url: http://hooks.local/notify
resource:
  po: true
  configmap: true
  node: false
customResources:
  - group: monitoring.coreos.com
    version: v1
    resource: prometheusrules
namespace: bar
diff:
  ignore:
    - metadata.resourceVersion
  ignoredFieldsByKind:
    ConfigMap:
      data:
        timestamp: ~
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.handler.webhook.url, "http://hooks.local/notify");
        assert_eq!(config.resource.get("po"), Some(&true));
        assert_eq!(config.custom_resources.len(), 1);
        assert!(config.custom_resources[0].namespaced);
        assert_eq!(config.namespace_filter().as_deref(), Some("bar"));
        assert_eq!(config.metrics_address(), DEFAULT_LISTEN_ADDRESS);
    }

    #[test]
    fn test_blank_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::from_path(Path::new("/nonexistent/dir/.kubewatch.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_watched_kinds_in_registry_order() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let kinds = config.watched_kinds().unwrap();
        let names: Vec<&str> = kinds.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["Pod", "ConfigMap", "prometheusrules"]);
        assert!(kinds.iter().all(|k| k.namespace.as_deref() == Some("bar")));
    }

    #[test]
    fn test_ignored_fields_per_kind() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        let pod = config.ignored_fields_for("Pod");
        assert_eq!(pod, IgnoredFields::from_paths(["metadata.resourceVersion"]));

        let cm = config.ignored_fields_for("ConfigMap");
        assert_eq!(
            cm,
            IgnoredFields::from_paths(["metadata.resourceVersion", "data.timestamp"])
        );
    }

    #[test]
    fn test_legacy_handler_keys() {
        let yaml = r##"
handler:
  slackwebhook:
    channel: "#alerts"
    slackwebhookurl: https://hooks.slack.local/T000
  webhook:
    url: https://hooks.local/
    tlsskip: true
  msteams:
    webhookurl: https://teams.local/hook
  lark:
    webhookurl: https://lark.local/hook
"##;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.handler.slack_webhook.url, "https://hooks.slack.local/T000");
        assert_eq!(config.handler.slack_webhook.channel, "#alerts");
        assert!(config.handler.webhook.tls_skip);
        assert_eq!(config.handler.msteams.webhook_url, "https://teams.local/hook");
        assert_eq!(config.handler.lark.webhook_url, "https://lark.local/hook");
    }

    #[test]
    fn test_webex_from_env() {
        let env: HashMap<&str, &str> = HashMap::from([("WEBEX_ACCESS_TOKEN", "secret"), ("WEBEX_ROOM", "room-1")]);
        let mut config = Config::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.handler.webex.token, "secret");
        assert_eq!(config.handler.webex.room, "room-1");
        assert!(config.handler.webex.url.is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let config = Config::from_yaml("resource:\n  pods: true\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownKind(id)) if id == "pods"));
    }

    #[test]
    fn test_env_fills_gaps_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("KW_DEPLOYMENT", "true"),
            ("KW_NODE", "false"),
            ("WATCH_NAMESPACE", "other"),
            ("KUBEWATCH_NAME", "prod-cluster"),
            ("KW_WEBHOOK_URL", "http://env.local/"),
            ("KW_DISCORD_WEBHOOKURL", "http://discord.local/"),
        ]);
        let mut config = Config::from_yaml(SAMPLE).unwrap();
        config.apply_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.resource.get("deployment"), Some(&true));
        assert_eq!(config.resource.get("node"), Some(&false));
        // File values win over the environment
        assert_eq!(config.namespace, "bar");
        assert_eq!(config.handler.webhook.url, "http://hooks.local/notify");
        // Gaps are filled
        assert_eq!(config.instance_name, "prod-cluster");
        assert_eq!(config.handler.discord.webhook_url, "http://discord.local/");
    }
}
