//! Events the tree reports back to its owner.
//!
//! The widget never calls back into the host; every externally visible state
//! change is queued as a [`TreeEvent`] and drained with
//! [`Tree::take_events`](crate::tree::Tree::take_events) after each input is
//! handled.

use crate::dnd::DropPosition;
use treeline_index::NodeKey;

/// Outcome of a completed drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropInfo {
    /// The node that was dragged.
    pub drag_key: NodeKey,
    /// The resolved drop target.
    pub target_key: NodeKey,
    /// Where relative to the target the node lands.
    pub position: DropPosition,
}

/// A notification from the tree to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// The checked key set changed. With a controlled checked set, feed the
    /// value back via `set_checked_keys` to accept the change.
    CheckedUpdated(Vec<NodeKey>),
    /// The selected key set changed.
    SelectedUpdated(Vec<NodeKey>),
    /// The expanded key set changed.
    ExpandedUpdated(Vec<NodeKey>),
    /// A drag started on the node.
    DragStarted {
        /// The dragged node.
        key: NodeKey,
    },
    /// The pointer entered a node while dragging.
    DragEntered {
        /// The hovered node.
        key: NodeKey,
    },
    /// The pointer left a node while dragging.
    DragLeft {
        /// The departed node.
        key: NodeKey,
    },
    /// The drag gesture ended (with or without a drop).
    DragEnded {
        /// The dragged node.
        key: NodeKey,
    },
    /// The pointer moved over a node while dragging. Emitted once per hover
    /// event, before drop resolution.
    DragOver {
        /// The hovered node.
        key: NodeKey,
    },
    /// A drop completed.
    Dropped(DropInfo),
    /// The node's children must be fetched. Complete with
    /// [`Tree::finish_load`](crate::tree::Tree::finish_load).
    LoadRequested {
        /// The node whose subtree is needed.
        key: NodeKey,
    },
}
