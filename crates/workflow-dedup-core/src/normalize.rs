//! Canonicalization of volatile workflow fields.
//!
//! Seeds and their "control after generate" toggles change on every run of
//! an otherwise identical workflow. Normalization rewrites them to fixed
//! values so that two snapshots of the same configuration compare equal.

use serde_json::{Map, Value};

use crate::types::MetadataTree;

/// Nesting bound used when no explicit one is configured.
///
/// Matches the recursion limit `serde_json` applies when parsing, so any
/// document loaded from disk fits within it.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 128;

/// Mapping keys holding a seed value
pub const SEED_KEYS: [&str; 2] = ["seed", "noise_seed"];

/// Mapping keys holding a seed control toggle
pub const CONTROL_KEYS: [&str; 2] = ["control_after_generate", "control_before_generate"];

/// Recognized control strings, matched case-insensitively
pub const CONTROL_VALUES: [&str; 4] = ["randomize", "increment", "decrement", "fixed"];

/// Bookkeeping keys that never take part in a comparison
pub const EXCLUDED_KEYS: [&str; 6] = [
    "last_node_id",
    "last_link_id",
    "version",
    "date",
    "time",
    "_meta_data_checksum",
];

const WIDGETS_KEY: &str = "widgets_values";
const INPUTS_KEY: &str = "inputs";
const FIXED: &str = "fixed";

/// Returns true if `key` is a bookkeeping key excluded from comparison
pub fn is_excluded_key(key: &str) -> bool {
    EXCLUDED_KEYS.contains(&key)
}

/// Returns true if `value` is a seed control string such as "randomize"
pub fn is_control_string(value: &str) -> bool {
    CONTROL_VALUES
        .iter()
        .any(|control| control.eq_ignore_ascii_case(value))
}

/// Return a normalized copy of `tree`, leaving the original untouched
pub fn normalize(tree: &MetadataTree) -> MetadataTree {
    normalize_with_depth(tree, DEFAULT_MAX_TREE_DEPTH)
}

/// Return a normalized copy of `tree`, descending at most `max_depth` levels
pub fn normalize_with_depth(tree: &MetadataTree, max_depth: usize) -> MetadataTree {
    let mut copy = tree.clone();
    normalize_in_place(&mut copy, max_depth);
    copy
}

/// Normalize `tree` in place.
///
/// Containers nested deeper than `max_depth` are left as they are.
pub fn normalize_in_place(tree: &mut MetadataTree, max_depth: usize) {
    normalize_node(tree, 0, max_depth);
}

fn normalize_node(node: &mut Value, depth: usize, max_depth: usize) {
    if depth > max_depth {
        return;
    }

    match node {
        Value::Object(map) => normalize_mapping(map, depth, max_depth),
        Value::Array(items) => {
            for item in items.iter_mut().filter(|item| is_container(item)) {
                normalize_node(item, depth + 1, max_depth);
            }
        }
        _ => {}
    }
}

fn normalize_mapping(map: &mut Map<String, Value>, depth: usize, max_depth: usize) {
    for key in SEED_KEYS {
        if let Some(value) = map.get_mut(key) {
            if value.is_number() {
                *value = Value::from(0);
            }
        }
    }

    for key in CONTROL_KEYS {
        if let Some(value) = map.get_mut(key) {
            if value.is_string() {
                *value = Value::from(FIXED);
            }
        }
    }

    if let Some(Value::Array(widgets)) = map.get_mut(WIDGETS_KEY) {
        normalize_widgets(widgets);
    }

    if let Some(inputs) = map.get_mut(INPUTS_KEY) {
        if inputs.is_object() {
            normalize_node(inputs, depth + 1, max_depth);
        }
    }

    for (key, value) in map.iter_mut() {
        if is_excluded_key(key) || !is_container(value) {
            continue;
        }
        normalize_node(value, depth + 1, max_depth);
    }
}

/// Positional seed detection: a number directly followed by a control string
/// is a seed, whatever its magnitude or sign.
fn normalize_widgets(widgets: &mut [Value]) {
    for i in 0..widgets.len() {
        if widgets[i].is_number() {
            let followed_by_control = widgets
                .get(i + 1)
                .and_then(Value::as_str)
                .is_some_and(is_control_string);
            if followed_by_control {
                widgets[i] = Value::from(0);
                widgets[i + 1] = Value::from(FIXED);
            }
        } else if widgets[i].as_str().is_some_and(is_control_string) {
            widgets[i] = Value::from(FIXED);
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_keys_zeroed() {
        let tree = json!({"seed": 123456789, "noise_seed": 42.5, "steps": 20});
        let normalized = normalize(&tree);
        assert_eq!(normalized, json!({"seed": 0, "noise_seed": 0, "steps": 20}));
    }

    #[test]
    fn test_non_numeric_seed_untouched() {
        let tree = json!({"seed": "abc", "noise_seed": true});
        assert_eq!(normalize(&tree), tree);
    }

    #[test]
    fn test_control_keys_fixed() {
        let tree = json!({
            "control_after_generate": "randomize",
            "control_before_generate": "whatever",
            "other": "randomize"
        });
        let normalized = normalize(&tree);
        assert_eq!(normalized["control_after_generate"], "fixed");
        assert_eq!(normalized["control_before_generate"], "fixed");
        assert_eq!(normalized["other"], "randomize");
    }

    #[test]
    fn test_widgets_control_pairs() {
        let a = normalize(&json!({"widgets_values": [123456, "randomize"]}));
        let b = normalize(&json!({"widgets_values": [42, "increment"]}));
        assert_eq!(a, json!({"widgets_values": [0, "fixed"]}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_widgets_pair_has_no_magnitude_bound() {
        let tree = json!({"widgets_values": [-7, "Decrement", 0, "FIXED", 1.5, "fixed"]});
        assert_eq!(
            normalize(&tree),
            json!({"widgets_values": [0, "fixed", 0, "fixed", 0, "fixed"]})
        );
    }

    #[test]
    fn test_widgets_lone_control_string() {
        let tree = json!({"widgets_values": ["euler", "Randomize", 20, 7.5]});
        assert_eq!(
            normalize(&tree),
            json!({"widgets_values": ["euler", "fixed", 20, 7.5]})
        );
    }

    #[test]
    fn test_nested_nodes_and_inputs() {
        let tree = json!({
            "nodes": [
                {"id": 3, "widgets_values": [99, "randomize", "euler"]},
                {"id": 4, "inputs": {"noise_seed": 5, "cfg": 8}}
            ],
            "prompt": {"3": {"inputs": {"seed": 77}}}
        });
        let normalized = normalize(&tree);
        assert_eq!(normalized["nodes"][0]["widgets_values"], json!([0, "fixed", "euler"]));
        assert_eq!(normalized["nodes"][1]["inputs"], json!({"noise_seed": 0, "cfg": 8}));
        assert_eq!(normalized["prompt"]["3"]["inputs"]["seed"], 0);
    }

    #[test]
    fn test_excluded_keys_not_descended() {
        let tree = json!({"version": {"seed": 5}, "extra": {"seed": 5}});
        let normalized = normalize(&tree);
        assert_eq!(normalized["version"]["seed"], 5);
        assert_eq!(normalized["extra"]["seed"], 0);
    }

    #[test]
    fn test_normalize_does_not_mutate_input() {
        let tree = json!({"seed": 10});
        let _ = normalize(&tree);
        assert_eq!(tree["seed"], 10);
    }

    #[test]
    fn test_idempotent() {
        let trees = [
            json!({"seed": 1, "widgets_values": [5, "increment", "randomize", 3]}),
            json!([{"inputs": {"seed": 9}}, [1, "fixed"], null]),
            json!({"a": {"b": {"control_after_generate": "decrement"}}}),
            json!("scalar"),
        ];
        for tree in trees {
            let once = normalize(&tree);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_depth_bound_leaves_deep_branches() {
        let tree = json!({"a": {"b": {"seed": 3}}, "seed": 1});
        let normalized = normalize_with_depth(&tree, 1);
        assert_eq!(normalized["seed"], 0);
        assert_eq!(normalized["a"]["b"]["seed"], 3);
    }

    #[test]
    fn test_is_control_string() {
        assert!(is_control_string("RANDOMIZE"));
        assert!(is_control_string("fixed"));
        assert!(!is_control_string("random"));
    }
}
