//! Watched kind registry
//!
//! Explicit registration table mapping each configurable resource flag to
//! the API coordinates and display name of the kind it enables. Resolved
//! once at startup; nothing is derived from runtime type inspection.

use crate::config::CustomResource;
use crate::error::ConfigError;
use crate::ignored_fields::IgnoredFields;

/// Static description of a built-in watchable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Configuration flag / registry id (e.g. "po", "deployment")
    pub id: &'static str,
    /// Environment variable enabling the kind (e.g. "KW_POD")
    pub env: &'static str,
    /// Display name used in notifications and metrics labels
    pub name: &'static str,
    /// API group ("" for the core group)
    pub group: &'static str,
    /// API version
    pub version: &'static str,
    /// Plural resource name used in API paths
    pub plural: &'static str,
    /// Whether objects of this kind live in a namespace
    pub namespaced: bool,
}

/// All built-in kinds, in the order watchers are started.
pub const BUILTIN_KINDS: &[KindDescriptor] = &[
    KindDescriptor { id: "coreevent", env: "KW_CORE_EVENT", name: "Event", group: "", version: "v1", plural: "events", namespaced: true },
    KindDescriptor { id: "event", env: "KW_EVENT", name: "Event", group: "events.k8s.io", version: "v1", plural: "events", namespaced: true },
    KindDescriptor { id: "po", env: "KW_POD", name: "Pod", group: "", version: "v1", plural: "pods", namespaced: true },
    KindDescriptor { id: "hpa", env: "KW_HPA", name: "HorizontalPodAutoscaler", group: "autoscaling", version: "v1", plural: "horizontalpodautoscalers", namespaced: true },
    KindDescriptor { id: "ds", env: "KW_DAEMONSET", name: "DaemonSet", group: "apps", version: "v1", plural: "daemonsets", namespaced: true },
    KindDescriptor { id: "statefulset", env: "KW_STATEFULSET", name: "StatefulSet", group: "apps", version: "v1", plural: "statefulsets", namespaced: true },
    KindDescriptor { id: "rs", env: "KW_REPLICASET", name: "ReplicaSet", group: "apps", version: "v1", plural: "replicasets", namespaced: true },
    KindDescriptor { id: "svc", env: "KW_SERVICE", name: "Service", group: "", version: "v1", plural: "services", namespaced: true },
    KindDescriptor { id: "deployment", env: "KW_DEPLOYMENT", name: "Deployment", group: "apps", version: "v1", plural: "deployments", namespaced: true },
    KindDescriptor { id: "ns", env: "KW_NAMESPACE", name: "Namespace", group: "", version: "v1", plural: "namespaces", namespaced: false },
    KindDescriptor { id: "rc", env: "KW_REPLICATION_CONTROLLER", name: "ReplicationController", group: "", version: "v1", plural: "replicationcontrollers", namespaced: true },
    KindDescriptor { id: "job", env: "KW_JOB", name: "Job", group: "batch", version: "v1", plural: "jobs", namespaced: true },
    KindDescriptor { id: "node", env: "KW_NODE", name: "Node", group: "", version: "v1", plural: "nodes", namespaced: false },
    KindDescriptor { id: "sa", env: "KW_SERVICE_ACCOUNT", name: "ServiceAccount", group: "", version: "v1", plural: "serviceaccounts", namespaced: true },
    KindDescriptor { id: "clusterrole", env: "KW_CLUSTER_ROLE", name: "ClusterRole", group: "rbac.authorization.k8s.io", version: "v1", plural: "clusterroles", namespaced: false },
    KindDescriptor { id: "clusterrolebinding", env: "KW_CLUSTER_ROLE_BINDING", name: "ClusterRoleBinding", group: "rbac.authorization.k8s.io", version: "v1", plural: "clusterrolebindings", namespaced: false },
    KindDescriptor { id: "pv", env: "KW_PERSISTENT_VOLUME", name: "PersistentVolume", group: "", version: "v1", plural: "persistentvolumes", namespaced: false },
    KindDescriptor { id: "secret", env: "KW_SECRET", name: "Secret", group: "", version: "v1", plural: "secrets", namespaced: true },
    KindDescriptor { id: "configmap", env: "KW_CONFIGMAP", name: "ConfigMap", group: "", version: "v1", plural: "configmaps", namespaced: true },
    KindDescriptor { id: "ing", env: "KW_INGRESS", name: "Ingress", group: "networking.k8s.io", version: "v1", plural: "ingresses", namespaced: true },
];

/// Looks up a built-in kind by its configuration id.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static KindDescriptor> {
    BUILTIN_KINDS.iter().find(|k| k.id == id)
}

/// Fully resolved kind to watch: API coordinates, namespace filter and
/// diff settings. Immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedKind {
    /// Display name (notification kind and metrics `resourceType` label)
    pub name: String,
    pub group: String,
    pub version: String,
    pub plural: String,
    pub namespaced: bool,
    /// Namespace filter; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Effective ignored field tree (global merged with kind-specific)
    pub ignored_fields: IgnoredFields,
}

impl WatchedKind {
    /// Builds a watched kind from a registry entry.
    #[must_use]
    pub fn builtin(desc: &KindDescriptor, namespace: Option<String>, ignored_fields: IgnoredFields) -> Self {
        Self {
            name: desc.name.to_string(),
            group: desc.group.to_string(),
            version: desc.version.to_string(),
            plural: desc.plural.to_string(),
            namespaced: desc.namespaced,
            namespace: if desc.namespaced { namespace } else { None },
            ignored_fields,
        }
    }

    /// Builds a watched kind from a custom resource descriptor.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCustomResource` if version or resource is empty.
    pub fn custom(
        crd: &CustomResource,
        namespace: Option<String>,
        ignored_fields: IgnoredFields,
    ) -> Result<Self, ConfigError> {
        if crd.version.is_empty() || crd.resource.is_empty() {
            return Err(ConfigError::InvalidCustomResource(format!(
                "group={:?} version={:?} resource={:?}: version and resource are required",
                crd.group, crd.version, crd.resource
            )));
        }
        Ok(Self {
            name: crd.kind.clone().unwrap_or_else(|| crd.resource.clone()),
            group: crd.group.clone(),
            version: crd.version.clone(),
            plural: crd.resource.clone(),
            namespaced: crd.namespaced,
            namespace: if crd.namespaced { namespace } else { None },
            ignored_fields,
        })
    }

    /// Returns the `apiVersion` string ("v1", "apps/v1", ...).
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_unique() {
        for (i, a) in BUILTIN_KINDS.iter().enumerate() {
            for b in &BUILTIN_KINDS[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate registry id");
                assert_ne!(a.env, b.env, "duplicate env var");
            }
        }
    }

    #[test]
    fn test_api_version() {
        let pod = WatchedKind::builtin(lookup("po").unwrap(), None, IgnoredFields::new());
        assert_eq!(pod.api_version(), "v1");

        let deploy = WatchedKind::builtin(lookup("deployment").unwrap(), None, IgnoredFields::new());
        assert_eq!(deploy.api_version(), "apps/v1");
    }

    #[test]
    fn test_cluster_scoped_kind_drops_namespace_filter() {
        let node = WatchedKind::builtin(lookup("node").unwrap(), Some("bar".to_string()), IgnoredFields::new());
        assert_eq!(node.namespace, None);

        let pod = WatchedKind::builtin(lookup("po").unwrap(), Some("bar".to_string()), IgnoredFields::new());
        assert_eq!(pod.namespace.as_deref(), Some("bar"));
    }

    #[test]
    fn test_custom_resource_defaults_name_to_resource() {
        let crd = CustomResource {
            group: "monitoring.coreos.com".to_string(),
            version: "v1".to_string(),
            resource: "prometheusrules".to_string(),
            kind: None,
            namespaced: true,
        };
        let kind = WatchedKind::custom(&crd, None, IgnoredFields::new()).unwrap();
        assert_eq!(kind.name, "prometheusrules");
        assert_eq!(kind.api_version(), "monitoring.coreos.com/v1");
    }

    #[test]
    fn test_custom_resource_requires_resource() {
        let crd = CustomResource {
            group: "example.com".to_string(),
            version: "v1".to_string(),
            resource: String::new(),
            kind: None,
            namespaced: true,
        };
        assert!(matches!(
            WatchedKind::custom(&crd, None, IgnoredFields::new()),
            Err(ConfigError::InvalidCustomResource(_))
        ));
    }
}
