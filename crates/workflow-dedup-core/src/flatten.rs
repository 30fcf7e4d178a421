use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::normalize::{is_excluded_key, DEFAULT_MAX_TREE_DEPTH};
use crate::types::{MetadataTree, Scalar};

/// A leaf of a metadata tree together with the route leading to it.
///
/// Mapping keys are joined with `.`, sequence indices rendered as `[i]`,
/// e.g. `nodes[3].widgets_values[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathValue {
    pub path: String,
    pub value: Scalar,
}

/// Order-independent encoding of all leaves of a tree
pub type PathSet = HashSet<PathValue>;

/// Flatten `tree` into its set of (path, scalar) pairs
pub fn flatten(tree: &MetadataTree) -> Result<PathSet> {
    flatten_with_depth(tree, DEFAULT_MAX_TREE_DEPTH)
}

/// Flatten `tree`, failing if containers nest deeper than `max_depth`
pub fn flatten_with_depth(tree: &MetadataTree, max_depth: usize) -> Result<PathSet> {
    let mut paths = PathSet::new();
    collect_paths(tree, String::new(), 0, max_depth, &mut paths)?;
    Ok(paths)
}

fn collect_paths(
    node: &Value,
    path: String,
    depth: usize,
    max_depth: usize,
    out: &mut PathSet,
) -> Result<()> {
    match node {
        Value::Object(map) => {
            if depth > max_depth {
                return Err(Error::TreeTooDeep { depth: max_depth });
            }

            // Sorted so paths line up across trees with different key order
            let mut entries: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(key, _)| !is_excluded_key(key))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            for (key, child) in entries {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                collect_paths(child, child_path, depth + 1, max_depth, out)?;
            }
        }
        Value::Array(items) => {
            if depth > max_depth {
                return Err(Error::TreeTooDeep { depth: max_depth });
            }

            for (index, item) in items.iter().enumerate() {
                collect_paths(item, format!("{}[{}]", path, index), depth + 1, max_depth, out)?;
            }
        }
        leaf => {
            if let Some(value) = Scalar::from_value(leaf) {
                out.insert(PathValue { path, value });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pv(path: &str, value: Value) -> PathValue {
        PathValue {
            path: path.to_string(),
            value: Scalar::from_value(&value).unwrap(),
        }
    }

    #[test]
    fn test_flatten_paths() {
        let tree = json!({
            "nodes": [{"id": 1, "widgets_values": [7, "fixed"]}],
            "extra": {"ds": {"scale": 1.5}},
            "flag": null
        });
        let paths = flatten(&tree).unwrap();

        let expected: PathSet = [
            pv("nodes[0].id", json!(1)),
            pv("nodes[0].widgets_values[0]", json!(7)),
            pv("nodes[0].widgets_values[1]", json!("fixed")),
            pv("extra.ds.scale", json!(1.5)),
            pv("flag", Value::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let a: Value = serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": 0}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 0, "y": 1}, "b": 2}"#).unwrap();
        assert_eq!(flatten(&a).unwrap(), flatten(&b).unwrap());
    }

    #[test]
    fn test_root_sequence_and_scalar() {
        let paths = flatten(&json!([1, [2]])).unwrap();
        assert!(paths.contains(&pv("[0]", json!(1))));
        assert!(paths.contains(&pv("[1][0]", json!(2))));

        let scalar = flatten(&json!("only")).unwrap();
        assert_eq!(scalar.len(), 1);
        assert!(scalar.contains(&pv("", json!("only"))));
    }

    #[test]
    fn test_empty_containers_emit_nothing() {
        assert!(flatten(&json!({})).unwrap().is_empty());
        assert!(flatten(&json!({"a": [], "b": {}})).unwrap().is_empty());
    }

    #[test]
    fn test_excluded_keys_skipped() {
        let paths = flatten(&json!({"version": 0.4, "last_node_id": 9, "x": 1})).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.contains(&pv("x", json!(1))));
    }

    #[test]
    fn test_depth_bound() {
        let tree = json!({"a": {"b": {"c": 1}}});
        assert!(flatten_with_depth(&tree, 2).is_ok());
        assert!(matches!(
            flatten_with_depth(&tree, 1),
            Err(Error::TreeTooDeep { depth: 1 })
        ));
    }
}
