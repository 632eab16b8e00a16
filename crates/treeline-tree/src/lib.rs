#![forbid(unsafe_code)]

//! The treeline Tree widget: a virtualized, animated, drag-and-drop-capable
//! hierarchical list view with controlled/uncontrolled state, keyboard
//! navigation, and lazy subtree loading.
//!
//! The widget is driven entirely by the host event loop: feed it key/mouse
//! events and a clock via [`Tree::tick`], drain the resulting
//! [`TreeEvent`]s, and render it into a [`Buffer`].
//!
//! [`Buffer`]: treeline_core::buffer::Buffer

pub mod dnd;
pub mod events;
mod keyboard;
pub mod motion;
pub mod scrollbar;
pub mod state;
pub mod tree;
pub mod viewport;

pub use dnd::{DragPhase, DropPosition, DropRequest, default_allow_drop};
pub use events::{DropInfo, TreeEvent};
pub use tree::{RenderStrategy, Tree, TreeStyle};

use treeline_core::buffer::{Buffer, Cell};
use treeline_core::geometry::Rect;
use treeline_core::style::Style;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Overlay a style onto a cell, keeping its content.
pub(crate) fn apply_style(cell: &mut Cell, style: Style) {
    cell.style = cell.style.patch(style);
}

/// Overlay a style onto every cell in an area.
pub(crate) fn set_style_area(buf: &mut Buffer, area: Rect, style: Style) {
    if style.is_empty() {
        return;
    }
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            if let Some(cell) = buf.get_mut(x, y) {
                apply_style(cell, style);
            }
        }
    }
}

/// Draw a text span at the given position, clipping at `max_x` (exclusive).
///
/// Returns the x position after the last drawn grapheme.
pub(crate) fn draw_text_span(
    buf: &mut Buffer,
    mut x: u16,
    y: u16,
    content: &str,
    style: Style,
    max_x: u16,
) -> u16 {
    for grapheme in content.graphemes(true) {
        if x >= max_x {
            break;
        }
        let w = UnicodeWidthStr::width(grapheme);
        if w == 0 {
            continue;
        }
        if x + w as u16 > max_x {
            break;
        }
        if let Some(c) = grapheme.chars().next() {
            let mut cell = Cell::from_char(c);
            apply_style(&mut cell, style);
            buf.set(x, y, cell);
        }
        x = x.saturating_add(w as u16);
    }
    x
}
