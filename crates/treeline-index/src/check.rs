//! Bulk check-state computation over the index.
//!
//! With cascade enabled, checking a node checks its non-disabled descendants
//! and derives ancestor state upward: a parent whose non-disabled children
//! are all checked becomes checked, a parent with a partially checked
//! subtree becomes indeterminate. Disabled nodes neither receive nor
//! propagate cascade effects.

use std::collections::HashSet;

use crate::index::{NodeId, TreeIndex};
use crate::node::NodeKey;

/// Policy knobs for [`TreeIndex::check`] and [`TreeIndex::uncheck`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckPolicy {
    /// Propagate checks through the hierarchy.
    pub cascade: bool,
    /// Report only leaf keys as checked.
    pub leaf_only: bool,
}

/// Resolved check state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckState {
    /// Fully checked keys, in pre-order.
    pub checked_keys: Vec<NodeKey>,
    /// Partially checked (indeterminate) keys, in pre-order.
    pub indeterminate_keys: Vec<NodeKey>,
}

impl TreeIndex {
    /// Compute the displayed check state for a set of checked keys.
    ///
    /// Unknown keys are dropped. Without cascade the input is simply
    /// filtered and deduplicated and nothing is indeterminate.
    #[must_use]
    pub fn check_state(&self, checked: &[NodeKey], cascade: bool) -> CheckState {
        let mut checked_ids: HashSet<NodeId> = HashSet::new();
        for &key in checked {
            if let Some(id) = self.id_of(key) {
                checked_ids.insert(id);
            }
        }

        if !cascade {
            let checked_keys = self
                .entry_ids()
                .filter(|id| checked_ids.contains(id))
                .map(|id| self.entry(id).key)
                .collect();
            return CheckState {
                checked_keys,
                indeterminate_keys: Vec::new(),
            };
        }

        // Downward pass: every non-disabled descendant of a checked node is
        // checked. Disabled nodes block the cascade for their whole subtree.
        let seeds: Vec<NodeId> = checked_ids.iter().copied().collect();
        let mut stack = seeds;
        while let Some(id) = stack.pop() {
            for &child in &self.entry(id).children {
                if self.entry(child).disabled {
                    continue;
                }
                if checked_ids.insert(child) {
                    stack.push(child);
                }
            }
        }

        // Upward pass: entries are stored pre-order, so a reverse scan sees
        // children before their parent.
        let mut indeterminate_ids: HashSet<NodeId> = HashSet::new();
        for id in self.entry_ids().rev() {
            let entry = self.entry(id);
            if entry.disabled || entry.children.is_empty() {
                continue;
            }
            let avail: Vec<NodeId> = entry
                .children
                .iter()
                .copied()
                .filter(|&c| !self.entry(c).disabled)
                .collect();
            if avail.is_empty() {
                continue;
            }
            if avail.iter().all(|c| checked_ids.contains(c)) {
                checked_ids.insert(id);
            } else if !checked_ids.contains(&id)
                && avail
                    .iter()
                    .any(|c| checked_ids.contains(c) || indeterminate_ids.contains(c))
            {
                indeterminate_ids.insert(id);
            }
        }

        let checked_keys = self
            .entry_ids()
            .filter(|id| checked_ids.contains(id))
            .map(|id| self.entry(id).key)
            .collect();
        let indeterminate_keys = self
            .entry_ids()
            .filter(|id| indeterminate_ids.contains(id))
            .map(|id| self.entry(id).key)
            .collect();
        CheckState {
            checked_keys,
            indeterminate_keys,
        }
    }

    /// Check `key` on top of the current checked set.
    #[must_use]
    pub fn check(&self, key: NodeKey, current: &[NodeKey], policy: CheckPolicy) -> CheckState {
        let mut next = current.to_vec();
        if !next.contains(&key) {
            next.push(key);
        }
        let state = self.check_state(&next, policy.cascade);
        self.apply_leaf_only(state, policy)
    }

    /// Uncheck `key`, removing it together with its cascade closure.
    #[must_use]
    pub fn uncheck(&self, key: NodeKey, current: &[NodeKey], policy: CheckPolicy) -> CheckState {
        if !policy.cascade {
            let next: Vec<NodeKey> = current.iter().copied().filter(|&k| k != key).collect();
            let state = self.check_state(&next, false);
            return self.apply_leaf_only(state, policy);
        }

        // Expand to the full cascade closure first, then strip the key, its
        // descendants, and its ancestors, so nothing re-derives the removed
        // branch.
        let closure = self.check_state(current, true);
        let mut remove: HashSet<NodeKey> = HashSet::new();
        remove.insert(key);
        if let Some(id) = self.id_of(key) {
            let mut stack = vec![id];
            while let Some(cursor) = stack.pop() {
                for &child in &self.entry(cursor).children {
                    remove.insert(self.entry(child).key);
                    stack.push(child);
                }
            }
            let mut parent = self.entry(id).parent;
            while let Some(p) = parent {
                remove.insert(self.entry(p).key);
                parent = self.entry(p).parent;
            }
        }
        let next: Vec<NodeKey> = closure
            .checked_keys
            .into_iter()
            .filter(|k| !remove.contains(k))
            .collect();
        let state = self.check_state(&next, true);
        self.apply_leaf_only(state, policy)
    }

    fn apply_leaf_only(&self, mut state: CheckState, policy: CheckPolicy) -> CheckState {
        if policy.leaf_only {
            state
                .checked_keys
                .retain(|&k| self.node_by_key(k).is_some_and(|n| n.is_leaf()));
        }
        state
    }
}
