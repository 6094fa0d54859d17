//! Raw changes produced by the watch glue and consumed by the workers.

use kube::api::DynamicObject;
use std::fmt;
use std::sync::Arc;

/// Lifecycle transition observed for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    /// Lower-case label used in logs and the `eventType` metrics label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed delta, queued by key.
#[derive(Debug, Clone)]
pub struct RawChange {
    pub key: String,
    pub change_type: ChangeType,
    /// Kind display name
    pub kind: String,
    pub api_version: String,
    /// Snapshot at observation time; `None` on delete
    pub object: Option<Arc<DynamicObject>>,
    /// Predecessor snapshot; present only on update
    pub old_object: Option<Arc<DynamicObject>>,
    /// Finer classification than kind (e.g. "NodeNotReady")
    pub subtype: Option<String>,
}

/// Queue key of an object: `namespace/name`, or `name` when cluster-scoped.
///
/// Works on the final-state object delivered with a delete as well.
#[must_use]
pub fn object_key(obj: &DynamicObject) -> Option<String> {
    let name = obj.metadata.name.as_deref().filter(|n| !n.is_empty())?;
    match obj.metadata.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => Some(format!("{ns}/{name}")),
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::dynamic_object;
    use serde_json::json;

    #[test]
    fn test_object_key() {
        let pod = dynamic_object(json!({"metadata": {"name": "foo", "namespace": "bar"}}));
        assert_eq!(object_key(&pod).as_deref(), Some("bar/foo"));

        let node = dynamic_object(json!({"metadata": {"name": "worker-1"}}));
        assert_eq!(object_key(&node).as_deref(), Some("worker-1"));

        let unnamed = dynamic_object(json!({"metadata": {"namespace": "bar"}}));
        assert_eq!(object_key(&unnamed), None);
    }
}
