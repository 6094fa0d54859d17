//! Local object cache seam.
//!
//! Workers resolve queued keys through [`WatchCache`]; in production it is
//! backed by the kube-runtime reflector store fed by the watch task.

use crate::error::ControllerError;
use kube::api::{ApiResource, DynamicObject};
use kube_runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;
use std::time::Duration;

/// Keyed view of the objects of one kind.
#[async_trait::async_trait]
pub trait WatchCache: Send + Sync {
    /// Resolves once the initial listing has been delivered.
    async fn wait_synced(&self) -> Result<(), ControllerError>;

    /// Looks up an object by `namespace/name` or `name`.
    fn get_by_key(&self, key: &str) -> Result<Option<Arc<DynamicObject>>, ControllerError>;
}

/// Splits a key into (namespace, name).
///
/// # Errors
///
/// Returns `ControllerError::Cache` for an empty name or more than one `/`.
pub fn parse_key(key: &str) -> Result<(Option<&str>, &str), ControllerError> {
    let (namespace, name) = match key.split_once('/') {
        Some((ns, name)) => (Some(ns), name),
        None => (None, key),
    };
    if name.is_empty() || name.contains('/') || namespace.is_some_and(str::is_empty) {
        return Err(ControllerError::Cache(format!("malformed key {key:?}")));
    }
    Ok((namespace, name))
}

/// [`WatchCache`] over a reflector store.
#[derive(Debug, Clone)]
pub struct StoreCache {
    store: Store<DynamicObject>,
    resource: ApiResource,
    sync_timeout: Option<Duration>,
}

impl StoreCache {
    pub fn new(store: Store<DynamicObject>, resource: ApiResource, sync_timeout: Option<Duration>) -> Self {
        Self {
            store,
            resource,
            sync_timeout,
        }
    }
}

#[async_trait::async_trait]
impl WatchCache for StoreCache {
    async fn wait_synced(&self) -> Result<(), ControllerError> {
        let ready = self.store.wait_until_ready();
        let result = match self.sync_timeout {
            Some(timeout) => tokio::time::timeout(timeout, ready)
                .await
                .map_err(|_| ControllerError::Sync(format!("timed out after {}s", timeout.as_secs())))?,
            None => ready.await,
        };
        result.map_err(|e| ControllerError::Sync(e.to_string()))
    }

    fn get_by_key(&self, key: &str) -> Result<Option<Arc<DynamicObject>>, ControllerError> {
        let (namespace, name) = parse_key(key)?;
        let mut obj_ref = ObjectRef::<DynamicObject>::new_with(name, self.resource.clone());
        if let Some(ns) = namespace {
            obj_ref = obj_ref.within(ns);
        }
        Ok(self.store.get(&obj_ref))
    }
}
