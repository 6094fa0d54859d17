//! Kubernetes resource watchers.
//!
//! One watch stream per kind feeds a reflector store and the kind's change
//! queue. Watch events are translated into raw changes by comparing them with
//! the store contents before the store is updated:
//!
//! - `Apply` with no stored predecessor is a create, with one an update
//! - `InitApply` during the first listing is a create (replays are dropped
//!   later by creation time)
//! - `InitApply` during a re-list is an update only if the resource version
//!   moved; objects missing from a re-list are reported as deleted
//! - `Delete` is a delete

use crate::change::{object_key, ChangeType, RawChange};
use crate::classifier::event_subtype;
use crate::error::ControllerError;
use crate::metrics::ChangeMetrics;
use crate::queue::ChangeQueue;
use futures::StreamExt;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use kube_runtime::reflector::store::Writer;
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::watcher::{self, watcher, Event};
use kube_runtime::WatchStreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use watch_config::WatchedKind;

/// Kinds whose `reason` field refines the notification kind
const EVENT_KIND: &str = "Event";

/// Builds the dynamic API resource of a watched kind.
#[must_use]
pub fn api_resource(kind: &WatchedKind) -> ApiResource {
    let gvk = GroupVersionKind::gvk(&kind.group, &kind.version, &kind.name);
    ApiResource::from_gvk_with_plural(&gvk, &kind.plural)
}

/// Builds the API handle honoring the namespace filter.
#[must_use]
pub fn kind_api(client: Client, kind: &WatchedKind, resource: &ApiResource) -> Api<DynamicObject> {
    match kind.namespace.as_deref() {
        Some(ns) if kind.namespaced => Api::namespaced_with(client, ns, resource),
        _ => Api::all_with(client, resource),
    }
}

/// Translates watch events into raw changes for one kind.
#[derive(Debug)]
pub struct ChangeTranslator {
    kind: Arc<WatchedKind>,
    api_version: String,
    resource: ApiResource,
    /// Set once the first listing completed
    listed: bool,
    /// Keys seen during the current re-list
    relisted: HashSet<String>,
}

impl ChangeTranslator {
    pub fn new(kind: Arc<WatchedKind>, resource: ApiResource) -> Self {
        Self {
            api_version: kind.api_version(),
            kind,
            resource,
            listed: false,
            relisted: HashSet::new(),
        }
    }

    /// Translates `event`. Must be called before the event is applied to `store`.
    pub fn translate(&mut self, event: &Event<DynamicObject>, store: &Store<DynamicObject>) -> Vec<RawChange> {
        match event {
            Event::Init => {
                self.relisted.clear();
                Vec::new()
            }
            Event::InitApply(obj) => {
                if !self.listed {
                    return self.change(ChangeType::Create, obj, None).into_iter().collect();
                }
                if let Some(key) = object_key(obj) {
                    self.relisted.insert(key);
                }
                match self.predecessor(obj, store) {
                    None => self.change(ChangeType::Create, obj, None),
                    Some(old) if old.metadata.resource_version != obj.metadata.resource_version => {
                        self.change(ChangeType::Update, obj, Some(old))
                    }
                    Some(_) => None,
                }
                .into_iter()
                .collect()
            }
            Event::InitDone => {
                let vanished = if self.listed { self.vanished(store) } else { Vec::new() };
                self.listed = true;
                self.relisted.clear();
                vanished
            }
            Event::Apply(obj) => {
                let change = match self.predecessor(obj, store) {
                    Some(old) => self.change(ChangeType::Update, obj, Some(old)),
                    None => self.change(ChangeType::Create, obj, None),
                };
                change.into_iter().collect()
            }
            Event::Delete(obj) => self.deleted(obj).into_iter().collect(),
        }
    }

    fn predecessor(&self, obj: &DynamicObject, store: &Store<DynamicObject>) -> Option<Arc<DynamicObject>> {
        store.get(&ObjectRef::from_obj_with(obj, self.resource.clone()))
    }

    /// Stored objects that did not reappear in the re-list
    fn vanished(&self, store: &Store<DynamicObject>) -> Vec<RawChange> {
        store
            .state()
            .iter()
            .filter(|obj| object_key(obj).is_some_and(|key| !self.relisted.contains(&key)))
            .filter_map(|obj| self.deleted(obj))
            .collect()
    }

    fn change(
        &self,
        change_type: ChangeType,
        obj: &DynamicObject,
        old: Option<Arc<DynamicObject>>,
    ) -> Option<RawChange> {
        let Some(key) = object_key(obj) else {
            warn!(kind = %self.kind.name, "Skipping object without a name");
            return None;
        };
        Some(RawChange {
            key,
            change_type,
            kind: self.kind.name.clone(),
            api_version: self.api_version.clone(),
            object: Some(Arc::new(obj.clone())),
            old_object: old,
            subtype: self.subtype(obj),
        })
    }

    fn deleted(&self, obj: &DynamicObject) -> Option<RawChange> {
        let mut change = self.change(ChangeType::Delete, obj, None)?;
        change.object = None;
        Some(change)
    }

    fn subtype(&self, obj: &DynamicObject) -> Option<String> {
        if self.kind.name != EVENT_KIND {
            return None;
        }
        let reason = obj.data.get("reason")?.as_str()?;
        event_subtype(reason).map(str::to_string)
    }
}

/// Counts and enqueues translated changes. Every change is counted here,
/// including ones the worker later suppresses.
pub fn enqueue_changes(changes: Vec<RawChange>, queue: &ChangeQueue<RawChange>, metrics: &ChangeMetrics) {
    for change in changes {
        debug!(key = %change.key, event_type = %change.change_type, "Observed change");
        metrics.observe(&change.kind, change.change_type);
        queue.add(change.key.clone(), change);
    }
}

/// Runs the watch stream of one kind until `cancel` fires, feeding `writer`
/// and `queue`. The queue is shut down on exit.
///
/// Stream errors are logged and the watch backs off and resumes.
///
/// # Errors
///
/// Returns `ControllerError::Watch` if the watch stream terminates.
pub async fn watch_kind(
    api: Api<DynamicObject>,
    mut writer: Writer<DynamicObject>,
    mut translator: ChangeTranslator,
    queue: ChangeQueue<RawChange>,
    metrics: Arc<ChangeMetrics>,
    cancel: CancellationToken,
) -> Result<(), ControllerError> {
    info!("Starting watcher");
    let store = writer.as_reader();
    let stream = watcher(api, watcher::Config::default()).default_backoff();
    futures::pin_mut!(stream);

    let result = loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            next = stream.next() => next,
        };
        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!("Watch error: {}", e);
                continue;
            }
            None => break Err(ControllerError::Watch("watch stream ended".to_string())),
        };

        enqueue_changes(translator.translate(&event, &store), &queue, &metrics);
        writer.apply_watcher_event(&event);
    };

    if result.is_err() {
        // Halts the kind's worker as well
        cancel.cancel();
    }
    queue.shut_down();
    info!("Watcher stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dynamic_object, pod_resource, test_pod};
    use serde_json::json;
    use watch_config::{registry, IgnoredFields};

    fn pod_kind() -> Arc<WatchedKind> {
        Arc::new(WatchedKind::builtin(registry::lookup("po").unwrap(), None, IgnoredFields::new()))
    }

    fn with_version(mut obj: DynamicObject, version: &str) -> DynamicObject {
        obj.metadata.resource_version = Some(version.to_string());
        obj
    }

    /// Translates then applies, like the watch loop.
    fn feed(
        translator: &mut ChangeTranslator,
        writer: &mut Writer<DynamicObject>,
        event: Event<DynamicObject>,
    ) -> Vec<(ChangeType, String)> {
        let store = writer.as_reader();
        let changes = translator.translate(&event, &store);
        writer.apply_watcher_event(&event);
        changes.into_iter().map(|c| (c.change_type, c.key)).collect()
    }

    #[test]
    fn test_api_resource() {
        let kind = WatchedKind::builtin(registry::lookup("deployment").unwrap(), None, IgnoredFields::new());
        let resource = api_resource(&kind);
        assert_eq!(resource.api_version, "apps/v1");
        assert_eq!(resource.kind, "Deployment");
        assert_eq!(resource.plural, "deployments");
    }

    #[test]
    fn test_initial_listing_yields_creates() {
        let mut writer = Writer::new(pod_resource());
        let mut translator = ChangeTranslator::new(pod_kind(), pod_resource());

        assert!(feed(&mut translator, &mut writer, Event::Init).is_empty());
        let changes = feed(&mut translator, &mut writer, Event::InitApply(test_pod("bar", "foo", "2024-01-01T00:00:00Z")));
        assert_eq!(changes, vec![(ChangeType::Create, "bar/foo".to_string())]);
        assert!(feed(&mut translator, &mut writer, Event::InitDone).is_empty());
    }

    #[test]
    fn test_apply_with_and_without_predecessor() {
        let mut writer = Writer::new(pod_resource());
        let mut translator = ChangeTranslator::new(pod_kind(), pod_resource());
        let pod = test_pod("bar", "foo", "2024-01-01T00:00:00Z");

        let created = feed(&mut translator, &mut writer, Event::Apply(pod.clone()));
        assert_eq!(created, vec![(ChangeType::Create, "bar/foo".to_string())]);

        let store = writer.as_reader();
        let updated = translator.translate(&Event::Apply(with_version(pod.clone(), "2")), &store);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].change_type, ChangeType::Update);
        assert_eq!(
            updated[0].old_object.as_ref().unwrap().metadata.resource_version.as_deref(),
            Some("1")
        );

        let deleted = translator.translate(&Event::Delete(pod), &store);
        assert_eq!(deleted[0].change_type, ChangeType::Delete);
        assert!(deleted[0].object.is_none());
    }

    #[test]
    fn test_relist_reports_only_real_changes() {
        let mut writer = Writer::new(pod_resource());
        let mut translator = ChangeTranslator::new(pod_kind(), pod_resource());
        let same = test_pod("bar", "same", "2024-01-01T00:00:00Z");
        let moved = test_pod("bar", "moved", "2024-01-01T00:00:00Z");
        let gone = test_pod("bar", "gone", "2024-01-01T00:00:00Z");

        feed(&mut translator, &mut writer, Event::Init);
        for pod in [&same, &moved, &gone] {
            feed(&mut translator, &mut writer, Event::InitApply(pod.clone()));
        }
        feed(&mut translator, &mut writer, Event::InitDone);

        // Re-list after a watch desync
        feed(&mut translator, &mut writer, Event::Init);
        assert!(feed(&mut translator, &mut writer, Event::InitApply(same)).is_empty());
        assert_eq!(
            feed(&mut translator, &mut writer, Event::InitApply(with_version(moved, "9"))),
            vec![(ChangeType::Update, "bar/moved".to_string())]
        );
        assert_eq!(
            feed(&mut translator, &mut writer, Event::InitApply(test_pod("bar", "new", "2024-01-02T00:00:00Z"))),
            vec![(ChangeType::Create, "bar/new".to_string())]
        );
        assert_eq!(
            feed(&mut translator, &mut writer, Event::InitDone),
            vec![(ChangeType::Delete, "bar/gone".to_string())]
        );
    }

    #[test]
    fn test_event_subtype_from_reason() {
        let kind = Arc::new(WatchedKind::builtin(
            registry::lookup("coreevent").unwrap(),
            None,
            IgnoredFields::new(),
        ));
        let resource = api_resource(&kind);
        let writer = Writer::new(resource.clone());
        let mut translator = ChangeTranslator::new(kind, resource);

        let event = dynamic_object(json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": {"name": "web-1.17a", "namespace": "bar"},
            "reason": "BackOff",
        }));
        let store = writer.as_reader();
        let changes = translator.translate(&Event::Apply(event), &store);
        assert_eq!(changes[0].subtype.as_deref(), Some("Backoff"));
        assert_eq!(changes[0].kind, "Event");

        let plain = dynamic_object(json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": {"name": "web-1.17b", "namespace": "bar"},
            "reason": "Scheduled",
        }));
        let changes = translator.translate(&Event::Apply(plain), &store);
        assert_eq!(changes[0].subtype, None);
    }
}
