//! Keyboard navigation over the flattened sequence.
//!
//! Key events resolve to a [`KeyAction`] against the current rows, the
//! expanded set, and the pending-focus key; the tree applies the action
//! (moving focus, toggling expansion, selecting). Resolution is pure so the
//! mapping can be tested without a widget.

use std::collections::HashSet;

use treeline_core::event::KeyCode;
use treeline_index::{NodeId, NodeKey, TreeIndex};

/// What a key press asks the tree to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    /// Move the pending-focus key to this node.
    MoveFocus(NodeKey),
    /// Expand this node (loading it first if needed).
    Expand(NodeKey),
    /// Collapse this node.
    Collapse(NodeKey),
    /// Select the pending node.
    Select(NodeKey),
    /// Nothing to do.
    None,
}

fn position_of(index: &TreeIndex, rows: &[NodeId], key: NodeKey) -> Option<usize> {
    let id = index.id_of(key)?;
    rows.iter().position(|&row| row == id)
}

/// The next focus target when stepping up or down, skipping disabled rows.
/// With no current focus (or a focus no longer visible), lands on the first
/// non-disabled row from the entered edge.
fn step_focus(
    index: &TreeIndex,
    rows: &[NodeId],
    pending: Option<NodeKey>,
    backward: bool,
) -> Option<NodeKey> {
    let current = pending.and_then(|key| position_of(index, rows, key));
    let candidates: Box<dyn Iterator<Item = &NodeId> + '_> = match (current, backward) {
        (Some(pos), false) => Box::new(rows[pos + 1..].iter()),
        (Some(pos), true) => Box::new(rows[..pos].iter().rev()),
        (None, false) => Box::new(rows.iter()),
        (None, true) => Box::new(rows.iter().rev()),
    };
    candidates
        .map(|&id| index.node(id))
        .find(|n| !n.disabled())
        .map(|n| n.key())
}

/// Resolve one key press.
pub(crate) fn resolve_key(
    index: &TreeIndex,
    rows: &[NodeId],
    expanded: &HashSet<NodeKey>,
    pending: Option<NodeKey>,
    code: KeyCode,
) -> KeyAction {
    match code {
        KeyCode::Up => match step_focus(index, rows, pending, true) {
            Some(key) => KeyAction::MoveFocus(key),
            None => KeyAction::None,
        },
        KeyCode::Down => match step_focus(index, rows, pending, false) {
            Some(key) => KeyAction::MoveFocus(key),
            None => KeyAction::None,
        },
        KeyCode::Left => {
            let Some(node) = pending.and_then(|key| index.node_by_key(key)) else {
                return KeyAction::None;
            };
            if !node.is_leaf() && expanded.contains(&node.key()) {
                KeyAction::Collapse(node.key())
            } else {
                match node.parent() {
                    Some(parent) if !parent.disabled() => KeyAction::MoveFocus(parent.key()),
                    _ => KeyAction::None,
                }
            }
        }
        KeyCode::Right => {
            let Some(node) = pending.and_then(|key| index.node_by_key(key)) else {
                return KeyAction::None;
            };
            if node.is_leaf() {
                return KeyAction::None;
            }
            if !expanded.contains(&node.key()) {
                return KeyAction::Expand(node.key());
            }
            node.child_ids()
                .iter()
                .map(|&id| index.node(id))
                .find(|n| !n.disabled())
                .map_or(KeyAction::None, |n| KeyAction::MoveFocus(n.key()))
        }
        KeyCode::Enter => match pending {
            Some(key) => KeyAction::Select(key),
            None => KeyAction::None,
        },
        _ => KeyAction::None,
    }
}
