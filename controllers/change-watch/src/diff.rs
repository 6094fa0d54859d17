//! Update diff suppression.
//!
//! Both snapshots of an update are pruned of the configured ignored fields
//! and compared structurally. An update whose remaining content is equal
//! carries no observable change and is not dispatched.

use serde_json::Value;
use watch_config::IgnoredFields;

/// Removes every path of `ignored` from `value`.
///
/// A redacted entry removes the attribute; a nested entry descends only
/// into a matching JSON object.
pub fn prune(value: &mut Value, ignored: &IgnoredFields) {
    let Value::Object(map) = value else {
        return;
    };
    for (name, nested) in ignored.iter() {
        match nested {
            None => {
                map.remove(name);
            }
            Some(subtree) => {
                if let Some(child) = map.get_mut(name) {
                    prune(child, subtree);
                }
            }
        }
    }
}

/// Lists the paths at which `old` and `new` differ (`spec.replicas`,
/// `spec.containers[0].image`). Empty when structurally equal.
#[must_use]
pub fn diff_paths(old: &Value, new: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_diffs("", old, new, &mut out);
    out
}

fn collect_diffs(path: &str, old: &Value, new: &Value, out: &mut Vec<String>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, va) in a {
                let child = join(path, key);
                match b.get(key) {
                    Some(vb) => collect_diffs(&child, va, vb, out),
                    None => out.push(child),
                }
            }
            for key in b.keys().filter(|k| !a.contains_key(*k)) {
                out.push(join(path, key));
            }
        }
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
            for (i, (va, vb)) in a.iter().zip(b).enumerate() {
                collect_diffs(&format!("{path}[{i}]"), va, vb, out);
            }
        }
        _ if old == new => {}
        _ => out.push(if path.is_empty() { ".".to_string() } else { path.to_string() }),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Decides whether an update should be dropped as noise.
///
/// Never suppresses when no fields are ignored or when either snapshot is
/// missing.
#[must_use]
pub fn is_noise(old: Option<&Value>, new: Option<&Value>, ignored: &IgnoredFields) -> bool {
    if ignored.is_empty() {
        return false;
    }
    let (Some(old), Some(new)) = (old, new) else {
        return false;
    };

    let mut old = old.clone();
    let mut new = new.clone();
    prune(&mut old, ignored);
    prune(&mut new, ignored);
    diff_paths(&old, &new).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_leaf_and_nested() {
        let mut value = json!({
            "metadata": {"name": "cm", "resourceVersion": "5"},
            "data": {"timestamp": "t1", "key": "v"},
            "status": {"phase": "Running"},
        });
        let ignored = IgnoredFields::from_paths(["metadata.resourceVersion", "data.timestamp", "status"]);
        prune(&mut value, &ignored);

        assert_eq!(value, json!({"metadata": {"name": "cm"}, "data": {"key": "v"}}));
    }

    #[test]
    fn test_prune_does_not_descend_into_non_objects() {
        let mut value = json!({"data": ["timestamp"], "other": 1});
        prune(&mut value, &IgnoredFields::from_paths(["data.timestamp", "missing.x"]));
        assert_eq!(value, json!({"data": ["timestamp"], "other": 1}));
    }

    #[test]
    fn test_diff_paths() {
        let old = json!({"spec": {"replicas": 1, "containers": [{"image": "a"}]}, "gone": true});
        let new = json!({"spec": {"replicas": 2, "containers": [{"image": "b"}]}, "added": 1});

        let mut paths = diff_paths(&old, &new);
        paths.sort();
        assert_eq!(paths, vec!["added", "gone", "spec.containers[0].image", "spec.replicas"]);
    }

    #[test]
    fn test_diff_array_length_change() {
        let paths = diff_paths(&json!({"items": [1]}), &json!({"items": [1, 2]}));
        assert_eq!(paths, vec!["items"]);
    }

    #[test]
    fn test_only_ignored_field_changed_is_noise() {
        let old = json!({"metadata": {"name": "cm"}, "data": {"timestamp": "t1", "key": "v"}});
        let new = json!({"metadata": {"name": "cm"}, "data": {"timestamp": "t2", "key": "v"}});
        let ignored: IgnoredFields = serde_yaml::from_str("data:\n  timestamp: ~\n").unwrap();

        assert!(is_noise(Some(&old), Some(&new), &ignored));
    }

    #[test]
    fn test_other_field_changed_is_not_noise() {
        let old = json!({"data": {"timestamp": "t1", "key": "v"}});
        let new = json!({"data": {"timestamp": "t2", "key": "w"}});
        let ignored = IgnoredFields::from_paths(["data.timestamp"]);

        assert!(!is_noise(Some(&old), Some(&new), &ignored));
    }

    #[test]
    fn test_empty_tree_passes_through() {
        let value = json!({"a": 1});
        assert!(!is_noise(Some(&value), Some(&value), &IgnoredFields::new()));
    }

    #[test]
    fn test_missing_snapshot_passes_through() {
        let value = json!({"a": 1});
        let ignored = IgnoredFields::from_paths(["a"]);
        assert!(!is_noise(None, Some(&value), &ignored));
        assert!(!is_noise(Some(&value), None, &ignored));
    }
}
