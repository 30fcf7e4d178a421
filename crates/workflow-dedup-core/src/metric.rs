//! Structural distance between two metadata trees.
//!
//! Both trees are normalized and flattened into path sets; the distance is
//! the size of the symmetric difference over the size of the union, in
//! percent. Identical trees are 0% apart, trees sharing no leaf are 100%.

use log::debug;
use std::path::PathBuf;

use crate::error::Result;
use crate::flatten::{flatten_with_depth, PathSet, PathValue};
use crate::normalize::{normalize_with_depth, DEFAULT_MAX_TREE_DEPTH};
use crate::types::{Document, MetadataTree};

/// Normalized, flattened form of one document.
///
/// The chain engine keeps the baseline as a fingerprint so it is never
/// normalized twice.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    /// Document name
    pub name: String,

    /// Document location
    pub path: PathBuf,

    /// Leaf paths of the normalized tree
    pub paths: PathSet,
}

impl Fingerprint {
    /// Fingerprint a document
    pub fn from_document(document: &Document, max_depth: usize) -> Result<Self> {
        let paths = fingerprint_tree(&document.tree, max_depth)?;
        debug!("Fingerprinted {}: {} leaf paths", document.name, paths.len());

        Ok(Self {
            name: document.name.clone(),
            path: document.path.clone(),
            paths,
        })
    }

    /// Distance to another fingerprint, in percent
    pub fn distance(&self, other: &Fingerprint) -> f64 {
        path_distance(&self.paths, &other.paths)
    }
}

/// Normalize a copy of `tree` and flatten it
pub fn fingerprint_tree(tree: &MetadataTree, max_depth: usize) -> Result<PathSet> {
    let normalized = normalize_with_depth(tree, max_depth);
    flatten_with_depth(&normalized, max_depth)
}

/// Percentage difference between two trees, ignoring volatile fields
pub fn difference_percent(left: &MetadataTree, right: &MetadataTree) -> Result<f64> {
    difference_percent_with_depth(left, right, DEFAULT_MAX_TREE_DEPTH)
}

/// Percentage difference between two trees with an explicit nesting bound
pub fn difference_percent_with_depth(
    left: &MetadataTree,
    right: &MetadataTree,
    max_depth: usize,
) -> Result<f64> {
    let left_paths = fingerprint_tree(left, max_depth)?;
    let right_paths = fingerprint_tree(right, max_depth)?;
    Ok(path_distance(&left_paths, &right_paths))
}

/// Symmetric difference over union, in percent; 0 for two empty sets
pub fn path_distance(left: &PathSet, right: &PathSet) -> f64 {
    let (smaller, larger) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };

    let common = smaller.iter().filter(|p| larger.contains(*p)).count();
    let union = left.len() + right.len() - common;
    if union == 0 {
        return 0.0;
    }

    let symmetric_difference = union - common;
    100.0 * symmetric_difference as f64 / union as f64
}

/// Leaves present on only one side of a comparison
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathDiff {
    pub only_in_left: Vec<PathValue>,
    pub only_in_right: Vec<PathValue>,
}

impl PathDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_left.is_empty() && self.only_in_right.is_empty()
    }
}

/// One-sided differences between two path sets, sorted by path
pub fn diff_paths(left: &PathSet, right: &PathSet) -> PathDiff {
    PathDiff {
        only_in_left: sorted_difference(left, right),
        only_in_right: sorted_difference(right, left),
    }
}

fn sorted_difference(from: &PathSet, without: &PathSet) -> Vec<PathValue> {
    let mut paths: Vec<PathValue> = from.difference(without).cloned().collect();
    paths.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
    });
    paths
}
