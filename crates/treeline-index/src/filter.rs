//! Pattern filtering: which nodes match, and what must expand to show them.

use std::collections::HashSet;

use crate::node::{NodeData, NodeKey};

/// Result of running a filter over a forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult {
    /// Keys whose subtrees must be expanded so every match is visible
    /// (the ancestors of matching nodes), in pre-order.
    pub expanded_keys: Vec<NodeKey>,
    /// Keys of the matching nodes themselves.
    pub highlight_keys: HashSet<NodeKey>,
}

/// The default filter: case-sensitive substring match on the label.
#[must_use]
pub fn default_filter(pattern: &str, node: &NodeData) -> bool {
    node.label.contains(pattern)
}

/// Collect the keys to expand and highlight for a pattern.
#[must_use]
pub fn keys_with_filter(
    data: &[NodeData],
    pattern: &str,
    filter: &dyn Fn(&str, &NodeData) -> bool,
) -> FilterResult {
    let mut result = FilterResult::default();
    let mut path = Vec::new();
    let mut expanded_seen = HashSet::new();
    for node in data {
        walk(node, pattern, filter, &mut path, &mut expanded_seen, &mut result);
    }
    result
}

fn walk(
    node: &NodeData,
    pattern: &str,
    filter: &dyn Fn(&str, &NodeData) -> bool,
    path: &mut Vec<NodeKey>,
    expanded_seen: &mut HashSet<NodeKey>,
    result: &mut FilterResult,
) {
    if filter(pattern, node) {
        result.highlight_keys.insert(node.key);
        for &ancestor in path.iter() {
            if expanded_seen.insert(ancestor) {
                result.expanded_keys.push(ancestor);
            }
        }
    }
    if let Some(children) = node.children.as_ref() {
        path.push(node.key);
        for child in children {
            walk(child, pattern, filter, path, expanded_seen, result);
        }
        path.pop();
    }
}
