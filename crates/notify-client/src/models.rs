//! Notification models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity label attached to every notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Normal,
    Warning,
    Danger,
}

impl Status {
    /// Returns the label as sent to sinks
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "Normal",
            Status::Warning => "Warning",
            Status::Danger => "Danger",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle label attached to every notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    Created,
    Updated,
    Deleted,
}

impl Reason {
    /// Returns the label as sent to sinks
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Created => "Created",
            Reason::Updated => "Updated",
            Reason::Deleted => "Deleted",
        }
    }

    /// Lower-case operation name ("create", "update", "delete")
    #[must_use]
    pub fn operation(self) -> &'static str {
        match self {
            Reason::Created => "create",
            Reason::Updated => "update",
            Reason::Deleted => "delete",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished notification, built once per dispatched change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub name: String,
    /// Empty for cluster-scoped objects
    pub namespace: String,
    /// Kind display name, or the subtype when one was derived
    pub kind: String,
    pub api_version: String,
    pub status: Status,
    pub reason: Reason,
    /// Current object; absent on delete or when conversion failed
    pub obj: Option<serde_json::Value>,
    /// Previous object; present only on update
    pub old_obj: Option<serde_json::Value>,
}

impl NotificationEvent {
    /// Renders the human-readable message shown by chat sinks.
    #[must_use]
    pub fn message(&self, instance: &str) -> String {
        let name = &self.name;
        let reason = self.reason;
        match self.kind.as_str() {
            "Namespace" => format!("`{instance}` - A namespace `{name}` has been `{reason}`"),
            "Node" => format!("`{instance}` - A node `{name}` has been `{reason}`"),
            "ClusterRole" => format!("`{instance}` - A cluster role `{name}` has been `{reason}`"),
            "NodeReady" => format!("`{instance}` - Node `{name}` is Ready : \nNodeReady"),
            "NodeNotReady" => format!("`{instance}` - Node `{name}` is Not Ready : \nNodeNotReady"),
            "NodeRebooted" => format!("`{instance}` - Node `{name}` Rebooted : \nNodeRebooted"),
            "Backoff" => format!(
                "`{instance}` - Pod `{name}` in `{}` Crashed : \nCrashLoopBackOff {reason}",
                self.namespace
            ),
            kind => format!(
                "`{instance}` - A `{kind}` in namespace `{}` has been `{reason}`:\n`{name}`",
                self.namespace
            ),
        }
    }
}
