//! Drag-and-drop types and session state.
//!
//! The resolution procedure itself lives on
//! [`Tree`](crate::tree::Tree): it needs the index, the expanded set, and
//! the flattened sequence. This module holds the vocabulary types, the
//! row-band classification, and the per-drag session record.

use std::time::Duration;

use treeline_index::{NodeKey, NodeRef};

/// Where relative to the target a drop lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// As the target's previous sibling.
    Before,
    /// As a child of the target.
    Inside,
    /// As the target's next sibling.
    After,
}

/// Which stage of the gesture a permission query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    /// Continuous queries while hovering.
    Drag,
    /// The final query at drop time.
    Drop,
}

/// A drop-permission query passed to the injected predicate.
#[derive(Debug, Clone, Copy)]
pub struct DropRequest<'a> {
    /// The candidate target node.
    pub node: NodeRef<'a>,
    /// The candidate position relative to the target.
    pub position: DropPosition,
    /// The gesture stage.
    pub phase: DragPhase,
}

/// The default drop permission: anything goes, except dropping inside a
/// leaf.
#[must_use]
pub fn default_allow_drop(req: &DropRequest<'_>) -> bool {
    !(req.position == DropPosition::Inside && req.node.is_leaf())
}

/// Pointer classification within a hovered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowBand {
    Before,
    Inside,
    After,
}

/// Classify the pointer's vertical offset within a row.
///
/// With inside-drops allowed and a row tall enough for three bands, the top
/// and bottom cell map to before/after and the middle to inside; otherwise
/// the row midpoint splits before from after.
pub(crate) fn classify_row_offset(offset_y: u16, row_height: u16, allow_inside: bool) -> RowBand {
    let row_height = row_height.max(1);
    let offset_y = offset_y.min(row_height - 1);
    if allow_inside && row_height >= 3 {
        if offset_y == 0 {
            RowBand::Before
        } else if offset_y >= row_height - 1 {
            RowBand::After
        } else {
            RowBand::Inside
        }
    } else if u32::from(offset_y) * 2 < u32::from(row_height) {
        RowBand::Before
    } else {
        RowBand::After
    }
}

/// The pending hover-expand intent: the target key and the countdown until
/// the timer fires, decremented by the tree's clock ticks. A `None`
/// countdown means the timer already fired and the expansion is waiting on
/// a load completion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HoverExpand {
    pub(crate) key: NodeKey,
    pub(crate) remaining: Option<Duration>,
}

/// Mutable state of one drag gesture.
///
/// Created on drag-start, continuously rewritten on drag-over, read at drop,
/// and cleared unconditionally on drag-end or when the pointer leaves the
/// tree.
#[derive(Debug, Default)]
pub(crate) struct DragSession {
    pub(crate) dragging: Option<NodeKey>,
    pub(crate) dropping: Option<NodeKey>,
    pub(crate) mouse_node: Option<NodeKey>,
    pub(crate) position: Option<DropPosition>,
    pub(crate) offset_level: u16,
    pub(crate) start_x: u16,
    pub(crate) hover_expand: Option<HoverExpand>,
}

impl DragSession {
    /// Clear everything, drag and drop alike.
    pub(crate) fn reset(&mut self) {
        self.dragging = None;
        self.reset_drop();
    }

    /// Clear the drop-resolution half of the session, keeping the dragged
    /// node.
    pub(crate) fn reset_drop(&mut self) {
        self.dropping = None;
        self.mouse_node = None;
        self.position = None;
        self.offset_level = 0;
        self.reset_hover();
    }

    /// Cancel the pending hover-expand intent.
    pub(crate) fn reset_hover(&mut self) {
        self.hover_expand = None;
    }

    /// The committed drop outcome, if the session has one.
    pub(crate) fn resolved(&self) -> Option<(NodeKey, NodeKey, DropPosition)> {
        match (self.dragging, self.dropping, self.position) {
            (Some(drag), Some(drop), Some(position)) => Some((drag, drop, position)),
            _ => None,
        }
    }
}
