//! Raw option data supplied by the application.

use std::fmt;

/// A stable node key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Create a key from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The numeric value of the key.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One node of the caller-owned option tree.
///
/// `children` distinguishes "not yet loaded" (`None`) from "loaded and
/// empty" (`Some` with an empty vec); lazy subtrees start out as `None` with
/// `is_leaf` set to `Some(false)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Unique key.
    pub key: NodeKey,
    /// Display label.
    pub label: String,
    /// Child nodes; `None` means the subtree has not been fetched.
    pub children: Option<Vec<NodeData>>,
    /// Whether the node is disabled.
    pub disabled: bool,
    /// Whether the node's checkbox is disabled.
    pub checkbox_disabled: bool,
    /// Explicit leaf flag; `None` derives leaf-ness from `children`.
    pub is_leaf: Option<bool>,
}

impl NodeData {
    /// Create a node with the given key and label.
    #[must_use]
    pub fn new(key: impl Into<NodeKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            children: None,
            disabled: false,
            checkbox_disabled: false,
            is_leaf: None,
        }
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, node: NodeData) -> Self {
        self.children.get_or_insert_with(Vec::new).push(node);
        self
    }

    /// Set the children from a vec, marking the subtree as loaded.
    #[must_use]
    pub fn with_children(mut self, nodes: Vec<NodeData>) -> Self {
        self.children = Some(nodes);
        self
    }

    /// Set the disabled flag.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the checkbox-disabled flag.
    #[must_use]
    pub fn with_checkbox_disabled(mut self, disabled: bool) -> Self {
        self.checkbox_disabled = disabled;
        self
    }

    /// Set the explicit leaf flag. `Some(false)` with no children marks a
    /// lazily loaded subtree.
    #[must_use]
    pub fn with_leaf(mut self, is_leaf: bool) -> Self {
        self.is_leaf = Some(is_leaf);
        self
    }

    /// Effective leaf-ness: the explicit flag, else "has no children field".
    #[must_use]
    pub fn effective_leaf(&self) -> bool {
        self.is_leaf.unwrap_or(self.children.is_none())
    }

    /// Whether the node's direct children have been fetched.
    #[must_use]
    pub fn shallow_loaded(&self) -> bool {
        self.is_leaf == Some(true) || self.children.is_some()
    }
}

/// Find a node by key anywhere in a forest, mutably.
pub fn find_node_mut(data: &mut [NodeData], key: NodeKey) -> Option<&mut NodeData> {
    for node in data {
        if node.key == key {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_node_mut(children, key) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_display() {
        assert_eq!(NodeKey::new(42).to_string(), "42");
        assert_eq!(NodeKey::from(7).value(), 7);
    }

    #[test]
    fn node_builders() {
        let n = NodeData::new(1, "root")
            .child(NodeData::new(2, "a"))
            .child(NodeData::new(3, "b").with_disabled(true));
        let children = n.children.as_ref().map(Vec::len);
        assert_eq!(children, Some(2));
        assert!(!n.disabled);
    }

    #[test]
    fn leaf_derivation() {
        let plain = NodeData::new(1, "x");
        assert!(plain.effective_leaf());

        let lazy = NodeData::new(2, "y").with_leaf(false);
        assert!(!lazy.effective_leaf());
        assert!(!lazy.shallow_loaded());

        let loaded_empty = NodeData::new(3, "z").with_children(vec![]);
        assert!(loaded_empty.shallow_loaded());

        let declared_leaf = NodeData::new(4, "w").with_leaf(true);
        assert!(declared_leaf.shallow_loaded());
    }

    #[test]
    fn find_node_mut_nested() {
        let mut data = vec![
            NodeData::new(1, "root").child(NodeData::new(2, "a").child(NodeData::new(4, "a1"))),
            NodeData::new(3, "other"),
        ];
        assert!(find_node_mut(&mut data, NodeKey::new(4)).is_some());
        assert!(find_node_mut(&mut data, NodeKey::new(3)).is_some());
        assert!(find_node_mut(&mut data, NodeKey::new(9)).is_none());

        if let Some(node) = find_node_mut(&mut data, NodeKey::new(2)) {
            node.children = Some(vec![]);
        }
        let a = find_node_mut(&mut data, NodeKey::new(2)).map(|n| n.children.clone());
        assert_eq!(a, Some(Some(vec![])));
    }
}
