//! The expansion animator.
//!
//! When the merged expanded set changes by exactly one added key or exactly
//! one removed key, a transient [`Motion`] is planned: a snapshot of the
//! flattened sequence with a synthetic segment spliced in immediately after
//! the toggled node, holding the rows being revealed or hidden. Any change
//! that cannot be attributed to a single toggle (multiple additions,
//! multiple removals, or a mix) skips animation and applies immediately.

use std::collections::HashSet;
use std::time::Duration;

use treeline_core::animation::{Timeline, ease_in_out};
use treeline_index::{NodeId, NodeKey, TreeIndex};

/// How long one expand/collapse transition runs.
pub(crate) const MOTION_DURATION: Duration = Duration::from_millis(150);

/// Direction of the animated toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    /// Rows are being revealed.
    Expand,
    /// Rows are being hidden.
    Collapse,
}

/// The synthetic segment spliced into the flattened snapshot.
#[derive(Debug, Clone)]
pub struct MotionSegment {
    /// Reveal or hide.
    pub mode: MotionMode,
    /// Total segment height in cells. Only computed under virtualization,
    /// where the viewport needs it without laying the hidden rows out.
    pub height: Option<u32>,
    /// The animating rows. Under virtualization, truncated to one viewport.
    pub nodes: Vec<NodeId>,
}

/// An in-flight expand/collapse transition.
#[derive(Debug)]
pub struct Motion {
    /// Snapshot of the flattened sequence the segment splices into: the
    /// pre-toggle sequence for an expand, the post-toggle one for a
    /// collapse.
    pub(crate) rows: Vec<NodeId>,
    /// The segment sits immediately after `rows[anchor]`.
    pub(crate) anchor: usize,
    /// The animating rows.
    pub(crate) segment: MotionSegment,
    timeline: Timeline,
}

impl Motion {
    /// Advance the transition. Returns true when it just completed.
    pub(crate) fn tick(&mut self, dt: Duration) -> bool {
        if self.timeline.is_complete() {
            return false;
        }
        self.timeline.tick(dt);
        self.timeline.is_complete()
    }

    /// How many of the segment's rows are currently visible.
    pub(crate) fn revealed(&self) -> usize {
        let len = self.segment.nodes.len();
        let shown = (len as f32 * self.timeline.value()).round() as usize;
        match self.segment.mode {
            MotionMode::Expand => shown.min(len),
            MotionMode::Collapse => len - shown.min(len),
        }
    }
}

/// Attribute an expanded-set change to a single toggle and plan the
/// transition for it. Returns `None` when the change is non-attributable or
/// the toggled node is not visible.
pub(crate) fn plan(
    index: &TreeIndex,
    prev: &HashSet<NodeKey>,
    next: &HashSet<NodeKey>,
    virtualized: bool,
    viewport_rows: usize,
    row_height: u16,
) -> Option<Motion> {
    let mut added: Option<NodeKey> = None;
    for &key in next {
        if !prev.contains(&key) {
            if added.is_some() {
                // Multiple expansions cannot come from one click.
                return None;
            }
            added = Some(key);
        }
    }
    let mut removed: Option<NodeKey> = None;
    for &key in prev {
        if !next.contains(&key) {
            if removed.is_some() {
                return None;
            }
            removed = Some(key);
        }
    }

    let (key, mode, rows) = match (added, removed) {
        (Some(key), None) => (key, MotionMode::Expand, index.flatten(prev)),
        (None, Some(key)) => (key, MotionMode::Collapse, index.flatten(next)),
        _ => return None,
    };

    let id = index.id_of(key)?;
    let anchor = rows.iter().position(|&row| row == id)?;
    let mut nodes = index.flatten_children(id, next);
    if nodes.is_empty() {
        return None;
    }
    let height = virtualized.then(|| nodes.len() as u32 * u32::from(row_height.max(1)));
    if virtualized {
        nodes.truncate(viewport_rows);
    }

    Some(Motion {
        rows,
        anchor,
        segment: MotionSegment {
            mode,
            height,
            nodes,
        },
        timeline: Timeline::new(MOTION_DURATION).easing(ease_in_out),
    })
}
