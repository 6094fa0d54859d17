//! Event normalization.
//!
//! Resolves a dequeued change back to the cached object, recovers the
//! (namespace, name) pair from the key and converts the snapshots to JSON.
//! Creates of objects that existed before the controller started are dropped
//! here so the initial listing does not flood the sinks.

use crate::cache::{parse_key, WatchCache};
use crate::change::{ChangeType, RawChange};
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use notify_client::{NotificationEvent, Reason, Status};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A change resolved against the cache, ready for diffing and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChange {
    pub key: String,
    pub change_type: ChangeType,
    pub name: String,
    pub namespace: String,
    /// Subtype when present, otherwise the kind display name
    pub kind: String,
    pub api_version: String,
    pub obj: Option<Value>,
    pub old_obj: Option<Value>,
}

impl NormalizedChange {
    #[must_use]
    pub fn into_event(self, status: Status, reason: Reason) -> NotificationEvent {
        NotificationEvent {
            name: self.name,
            namespace: self.namespace,
            kind: self.kind,
            api_version: self.api_version,
            status,
            reason,
            obj: self.obj,
            old_obj: self.old_obj,
        }
    }
}

/// Normalizer for one kind. `anchor` is the controller start time.
#[derive(Debug, Clone)]
pub struct Normalizer {
    anchor: DateTime<Utc>,
}

impl Normalizer {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self { anchor }
    }

    /// Returns `Ok(None)` when the change is a replayed create.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Cache` when the key is malformed or the
    /// cache lookup fails; the caller retries.
    pub fn normalize(
        &self,
        change: &RawChange,
        cache: &dyn WatchCache,
    ) -> Result<Option<NormalizedChange>, ControllerError> {
        let (key_namespace, name) = parse_key(&change.key)?;

        let current = match change.change_type {
            ChangeType::Delete => None,
            ChangeType::Create | ChangeType::Update => cache
                .get_by_key(&change.key)?
                .or_else(|| change.object.clone()),
        };

        if change.change_type == ChangeType::Create && !self.created_after_start(current.as_deref()) {
            debug!(key = %change.key, kind = %change.kind, "Skipping create of object that predates startup");
            return Ok(None);
        }

        let namespace = match key_namespace {
            Some(ns) => ns.to_string(),
            None => current
                .as_deref()
                .or(change.old_object.as_deref())
                .and_then(|obj| obj.metadata.namespace.clone())
                .unwrap_or_default(),
        };

        let old_obj = match change.change_type {
            ChangeType::Update => convert(change.old_object.as_ref(), change),
            ChangeType::Create | ChangeType::Delete => None,
        };

        Ok(Some(NormalizedChange {
            key: change.key.clone(),
            change_type: change.change_type,
            name: name.to_string(),
            namespace,
            kind: change.subtype.clone().unwrap_or_else(|| change.kind.clone()),
            api_version: change.api_version.clone(),
            obj: convert(current.as_ref(), change),
            old_obj,
        }))
    }

    /// Equal to the anchor counts as after. No timestamp counts as before.
    fn created_after_start(&self, obj: Option<&DynamicObject>) -> bool {
        obj.and_then(creation_timestamp)
            .is_some_and(|created| created >= self.anchor)
    }
}

/// Creation timestamp from object metadata.
#[must_use]
pub fn creation_timestamp(obj: &DynamicObject) -> Option<DateTime<Utc>> {
    let created = obj.metadata.creation_timestamp.as_ref()?.0;
    let nanos = u32::try_from(created.timestamp_subsec_nanos()).ok()?;
    DateTime::from_timestamp(created.timestamp(), nanos)
}

/// Converts an object to its JSON representation.
///
/// # Errors
///
/// Returns the serializer error when the object cannot be represented.
pub fn to_json(obj: &DynamicObject) -> Result<Value, serde_json::Error> {
    serde_json::to_value(obj)
}

fn convert(obj: Option<&Arc<DynamicObject>>, change: &RawChange) -> Option<Value> {
    let obj = obj?;
    match to_json(obj) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %change.key, kind = %change.kind, "Failed to convert object: {}", e);
            None
        }
    }
}
