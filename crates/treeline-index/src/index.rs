//! The arena-backed index proper.

use std::collections::{HashMap, HashSet};

use crate::node::{NodeData, NodeKey};

/// Handle to a node inside a [`TreeIndex`].
///
/// Handles are only meaningful against the index that produced them; after a
/// rebuild, resolve keys again via [`TreeIndex::id_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) key: NodeKey,
    pub(crate) label: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) sibling_index: usize,
    pub(crate) depth: u16,
    pub(crate) disabled: bool,
    pub(crate) is_leaf: bool,
    pub(crate) shallow_loaded: bool,
}

/// Immutable indexed view of an option forest.
///
/// Entries are stored in pre-order: a node always precedes its descendants,
/// so a reverse scan visits children before parents.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    entries: Vec<NodeEntry>,
    roots: Vec<NodeId>,
    by_key: HashMap<NodeKey, NodeId>,
}

impl TreeIndex {
    /// Build an index with the default disabled rule: a node is disabled if
    /// its own disabled flag or its checkbox-disabled flag is set.
    #[must_use]
    pub fn build(data: &[NodeData]) -> Self {
        Self::build_with(data, |n| n.disabled || n.checkbox_disabled)
    }

    /// Build an index with a custom disabled predicate.
    #[must_use]
    pub fn build_with(data: &[NodeData], disabled: impl Fn(&NodeData) -> bool) -> Self {
        let mut index = Self {
            entries: Vec::new(),
            roots: Vec::new(),
            by_key: HashMap::new(),
        };
        for (i, node) in data.iter().enumerate() {
            let id = index.insert(node, None, i, 0, &disabled);
            index.roots.push(id);
        }
        index
    }

    fn insert(
        &mut self,
        node: &NodeData,
        parent: Option<NodeId>,
        sibling_index: usize,
        depth: u16,
        disabled: &impl Fn(&NodeData) -> bool,
    ) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(NodeEntry {
            key: node.key,
            label: node.label.clone(),
            parent,
            children: Vec::new(),
            sibling_index,
            depth,
            disabled: disabled(node),
            is_leaf: node.effective_leaf(),
            shallow_loaded: node.shallow_loaded(),
        });
        // First key occurrence wins; a duplicate key is caller misuse.
        self.by_key.entry(node.key).or_insert(id);
        if let Some(children) = node.children.as_ref() {
            let ids: Vec<NodeId> = children
                .iter()
                .enumerate()
                .map(|(i, child)| self.insert(child, Some(id), i, depth + 1, disabled))
                .collect();
            self.entries[id.0].children = ids;
        }
        id
    }

    /// Total number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a key to its handle.
    #[must_use]
    pub fn id_of(&self, key: NodeKey) -> Option<NodeId> {
        self.by_key.get(&key).copied()
    }

    /// Access a node by handle. The handle must come from this index.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { index: self, id }
    }

    /// Checked variant of [`TreeIndex::node`].
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.entries.get(id.0).map(|_| NodeRef { index: self, id })
    }

    /// Access a node by key.
    #[must_use]
    pub fn node_by_key(&self, key: NodeKey) -> Option<NodeRef<'_>> {
        self.id_of(key).map(|id| NodeRef { index: self, id })
    }

    /// Handles of the root nodes, in input order.
    #[must_use]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn entry(&self, id: NodeId) -> &NodeEntry {
        &self.entries[id.0]
    }

    pub(crate) fn entry_ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        (0..self.entries.len()).map(NodeId)
    }

    /// Flatten to the visible-row sequence: pre-order, descending into a
    /// node's children iff its key is in `expanded`.
    #[must_use]
    pub fn flatten(&self, expanded: &HashSet<NodeKey>) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.flatten_into(root, expanded, &mut out);
        }
        out
    }

    /// Flatten the children of `id` (excluding `id` itself) with the given
    /// expanded set. This is the segment revealed or hidden when `id`'s own
    /// expansion toggles.
    #[must_use]
    pub fn flatten_children(&self, id: NodeId, expanded: &HashSet<NodeKey>) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in &self.entry(id).children {
            self.flatten_into(child, expanded, &mut out);
        }
        out
    }

    fn flatten_into(&self, id: NodeId, expanded: &HashSet<NodeKey>, out: &mut Vec<NodeId>) {
        out.push(id);
        let entry = self.entry(id);
        if expanded.contains(&entry.key) {
            for &child in &entry.children {
                self.flatten_into(child, expanded, out);
            }
        }
    }

    /// Keys of every non-leaf node, in pre-order.
    #[must_use]
    pub fn non_leaf_keys(&self) -> Vec<NodeKey> {
        self.entries
            .iter()
            .filter(|e| !e.is_leaf)
            .map(|e| e.key)
            .collect()
    }
}

/// Read-only view of one indexed node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    index: &'a TreeIndex,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.key())
            .field("label", &self.label())
            .finish()
    }
}

impl<'a> NodeRef<'a> {
    /// The node's handle.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn entry(&self) -> &'a NodeEntry {
        self.index.entry(self.id)
    }

    /// The node's key.
    #[must_use]
    pub fn key(&self) -> NodeKey {
        self.entry().key
    }

    /// The node's display label.
    #[must_use]
    pub fn label(&self) -> &'a str {
        &self.entry().label
    }

    /// Depth below the roots (roots are depth 0).
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.entry().depth
    }

    /// Merged disabled state (own or checkbox-disabled, per build rule).
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.entry().disabled
    }

    /// Whether the node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.entry().is_leaf
    }

    /// Whether the node's direct children have been fetched.
    #[must_use]
    pub fn shallow_loaded(&self) -> bool {
        self.entry().shallow_loaded
    }

    /// The parent node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.entry().parent.map(|id| self.index.node(id))
    }

    /// Handles of the node's children, in order.
    #[must_use]
    pub fn child_ids(&self) -> &'a [NodeId] {
        &self.entry().children
    }

    /// Whether the node is the first of its sibling group.
    #[must_use]
    pub fn is_first_child(&self) -> bool {
        self.entry().sibling_index == 0
    }

    /// Whether the node is the last of its sibling group.
    #[must_use]
    pub fn is_last_child(&self) -> bool {
        self.entry().sibling_index + 1 == self.sibling_group().len()
    }

    fn sibling_group(&self) -> &'a [NodeId] {
        match self.entry().parent {
            Some(parent) => &self.index.entry(parent).children,
            None => &self.index.roots,
        }
    }

    /// Whether `other` is this node or one of its descendants.
    #[must_use]
    pub fn contains(&self, other: &NodeRef<'_>) -> bool {
        let mut cursor = Some(other.id);
        while let Some(id) = cursor {
            if id == self.id {
                return true;
            }
            cursor = self.index.entry(id).parent;
        }
        false
    }

    /// The next sibling, optionally skipping disabled nodes.
    #[must_use]
    pub fn next_sibling(&self, include_disabled: bool) -> Option<NodeRef<'a>> {
        let group = self.sibling_group();
        group[self.entry().sibling_index + 1..]
            .iter()
            .map(|&id| self.index.node(id))
            .find(|n| include_disabled || !n.disabled())
    }

    /// The previous sibling, optionally skipping disabled nodes.
    #[must_use]
    pub fn prev_sibling(&self, include_disabled: bool) -> Option<NodeRef<'a>> {
        let group = self.sibling_group();
        group[..self.entry().sibling_index]
            .iter()
            .rev()
            .map(|&id| self.index.node(id))
            .find(|n| include_disabled || !n.disabled())
    }
}
