//! Before/after snapshots and their field-level diff.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Structured snapshots of an entity around a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// State before the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// State after the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    /// Human-readable `field: old → new` entries.
    #[serde(default)]
    pub changes: Vec<String>,
}

impl ChangeSet {
    /// Build a change set, deriving the diff from the snapshots.
    pub fn new(before: Option<Value>, after: Option<Value>) -> Self {
        let changes = match (&before, &after) {
            (Some(b), Some(a)) => diff_snapshots(b, a),
            _ => Vec::new(),
        };
        Self {
            before,
            after,
            changes,
        }
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

/// Diff two snapshots at the top level.
///
/// Keys are visited in sorted order. Non-object snapshots compare as a
/// single unnamed value.
pub fn diff_snapshots(before: &Value, after: &Value) -> Vec<String> {
    match (before.as_object(), after.as_object()) {
        (Some(old), Some(new)) => {
            let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
            keys.into_iter()
                .filter_map(|key| {
                    let old_value = old.get(key).unwrap_or(&Value::Null);
                    let new_value = new.get(key).unwrap_or(&Value::Null);
                    (old_value != new_value).then(|| {
                        format!("{}: {} → {}", key, render(old_value), render(new_value))
                    })
                })
                .collect()
        }
        _ if before != after => vec![format!("value: {} → {}", render(before), render(after))],
        _ => Vec::new(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_changed_added_removed() {
        let before = json!({"price": 100, "title": "North plot", "status": "draft"});
        let after = json!({"price": 120, "title": "North plot", "agent": "kim"});

        let changes = diff_snapshots(&before, &after);
        assert_eq!(
            changes,
            vec![
                "agent: null → kim".to_string(),
                "price: 100 → 120".to_string(),
                "status: draft → null".to_string(),
            ]
        );
    }

    #[test]
    fn test_change_set_requires_both_snapshots() {
        let set = ChangeSet::new(None, Some(json!({"a": 1})));
        assert!(set.changes.is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let snapshot = json!({"a": [1, 2], "b": {"c": true}});
        assert!(diff_snapshots(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_scalar_snapshots() {
        assert_eq!(
            diff_snapshots(&json!(1), &json!(2)),
            vec!["value: 1 → 2".to_string()]
        );
    }
}
