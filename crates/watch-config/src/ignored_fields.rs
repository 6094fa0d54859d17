//! Ignored field tree
//!
//! A nested mapping from attribute name to either "redact entirely" or a
//! nested tree. In YAML a leaf is written as `~` (null) and a nested entry
//! as a mapping:
//!
//! ```yaml
//! metadata:
//!   resourceVersion: ~
//!   managedFields: ~
//! data:
//!   timestamp: ~
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute paths removed from both snapshots before an update is diffed.
///
/// A `None` value removes the attribute outright; `Some(tree)` descends into
/// the attribute and only removes the named descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoredFields(BTreeMap<String, Option<IgnoredFields>>);

impl IgnoredFields {
    /// Creates an empty tree (ignores nothing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from dotted paths such as `data.timestamp`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert_path(path.as_ref());
        }
        tree
    }

    /// Returns true when no path is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the top-level entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&IgnoredFields>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Marks a single attribute as redacted entirely.
    pub fn redact(&mut self, name: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), None);
        self
    }

    /// Adds a nested subtree under `name`, merging with any existing entry.
    pub fn nest(&mut self, name: impl Into<String>, subtree: IgnoredFields) -> &mut Self {
        let mut single = IgnoredFields::new();
        single.0.insert(name.into(), Some(subtree));
        self.merge(&single);
        self
    }

    /// Inserts a dotted path. Empty segments are skipped.
    ///
    /// A path below an attribute that is already redacted entirely is a no-op.
    pub fn insert_path(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut node = self;
        for segment in parents {
            let entry = node
                .0
                .entry((*segment).to_string())
                .or_insert_with(|| Some(IgnoredFields::new()));
            match entry {
                Some(child) => node = child,
                None => return,
            }
        }
        node.0.insert((*last).to_string(), None);
    }

    /// Merges `other` into `self`. A redaction on either side wins over a
    /// nested entry for the same attribute.
    pub fn merge(&mut self, other: &IgnoredFields) {
        for (name, incoming) in &other.0 {
            match (self.0.get_mut(name), incoming) {
                (Some(None), _) => {}
                (Some(existing), None) => *existing = None,
                (Some(Some(existing)), Some(sub)) => existing.merge(sub),
                (None, _) => {
                    self.0.insert(name.clone(), incoming.clone());
                }
            }
        }
    }

    /// Returns a new tree containing both `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &IgnoredFields) -> IgnoredFields {
        let mut out = self.clone();
        out.merge(other);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_yaml() {
        let tree: IgnoredFields = serde_yaml::from_str("data:\n  timestamp: ~\nstatus: ~\n").unwrap();

        let mut expected = IgnoredFields::new();
        expected.redact("status");
        expected.nest("data", IgnoredFields::from_paths(["timestamp"]));
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_empty_value_means_redact() {
        let tree: IgnoredFields = serde_yaml::from_str("metadata:\n  resourceVersion:\n").unwrap();
        assert_eq!(tree, IgnoredFields::from_paths(["metadata.resourceVersion"]));
    }

    #[test]
    fn test_from_paths_shares_parents() {
        let tree = IgnoredFields::from_paths(["metadata.resourceVersion", "metadata.managedFields"]);
        let (name, sub) = tree.iter().next().unwrap();
        assert_eq!(name, "metadata");
        assert_eq!(sub.unwrap().iter().count(), 2);
    }

    #[test]
    fn test_path_below_redacted_parent_is_noop() {
        let mut tree = IgnoredFields::from_paths(["status"]);
        tree.insert_path("status.conditions");
        assert_eq!(tree, IgnoredFields::from_paths(["status"]));
    }

    #[test]
    fn test_blank_path_is_ignored() {
        let tree = IgnoredFields::from_paths(["", "..."]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_merge_redaction_wins() {
        let nested = IgnoredFields::from_paths(["status.conditions"]);
        let redacted = IgnoredFields::from_paths(["status"]);

        assert_eq!(nested.merged(&redacted), redacted);
        assert_eq!(redacted.merged(&nested), redacted);
    }

    #[test]
    fn test_merge_combines_nested() {
        let a = IgnoredFields::from_paths(["metadata.resourceVersion"]);
        let b = IgnoredFields::from_paths(["metadata.generation", "data.ts"]);
        let expected = IgnoredFields::from_paths([
            "metadata.resourceVersion",
            "metadata.generation",
            "data.ts",
        ]);
        assert_eq!(a.merged(&b), expected);
    }
}
