//! Test utilities for unit testing the change pipeline
//!
//! Builders for dynamic objects and raw changes plus an in-memory cache.

use crate::cache::{parse_key, WatchCache};
use crate::change::{object_key, ChangeType, RawChange};
use crate::error::ControllerError;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Builds a dynamic object from JSON, defaulting `apiVersion`/`kind` to a Pod.
pub fn dynamic_object(mut value: Value) -> DynamicObject {
    if let Value::Object(map) = &mut value {
        map.entry("apiVersion").or_insert_with(|| json!("v1"));
        map.entry("kind").or_insert_with(|| json!("Pod"));
    }
    serde_json::from_value(value).unwrap()
}

/// Pod with a creation timestamp (RFC 3339)
pub fn test_pod(namespace: &str, name: &str, created: &str) -> DynamicObject {
    dynamic_object(json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": created,
            "resourceVersion": "1",
        },
        "spec": {"containers": [{"name": "app", "image": "nginx"}]},
    }))
}

pub fn pod_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk("", "v1", "Pod"), "pods")
}

pub fn raw_change(change_type: ChangeType, object: Option<DynamicObject>, old: Option<DynamicObject>) -> RawChange {
    let key = object
        .as_ref()
        .or(old.as_ref())
        .and_then(object_key)
        .unwrap_or_default();
    RawChange {
        key,
        change_type,
        kind: "Pod".to_string(),
        api_version: "v1".to_string(),
        object: object.map(Arc::new),
        old_object: old.map(Arc::new),
        subtype: None,
    }
}

/// In-memory [`WatchCache`] with failure switches
#[derive(Debug, Default)]
pub struct MemoryCache {
    objects: Mutex<HashMap<String, Arc<DynamicObject>>>,
    fail_lookups: bool,
    /// Remaining lookups that fail before lookups succeed
    fail_first: AtomicUsize,
    never_synced: bool,
    sync_pending: bool,
    lookups: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with a transient cache error
    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    /// The first `count` lookups fail, later ones succeed
    pub fn failing_first(count: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    /// `wait_synced` never resolves
    pub fn syncing() -> Self {
        Self {
            sync_pending: true,
            ..Self::default()
        }
    }

    /// `wait_synced` always fails
    pub fn never_synced() -> Self {
        Self {
            never_synced: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, obj: DynamicObject) {
        let key = object_key(&obj).unwrap();
        self.objects.lock().unwrap().insert(key, Arc::new(obj));
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WatchCache for MemoryCache {
    async fn wait_synced(&self) -> Result<(), ControllerError> {
        if self.sync_pending {
            std::future::pending::<()>().await;
        }
        if self.never_synced {
            return Err(ControllerError::Sync("cache never synced".to_string()));
        }
        Ok(())
    }

    fn get_by_key(&self, key: &str) -> Result<Option<Arc<DynamicObject>>, ControllerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let transient = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.fail_lookups || transient {
            return Err(ControllerError::Cache(format!("lookup of {key} failed")));
        }
        parse_key(key)?;
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }
}
