//! Scrollbar indicator state and drawing.
//!
//! The tree keeps one [`ScrollbarState`] synchronized with its viewport
//! (after data changes, scrolls, resizes, and animation completion) and
//! draws it into the rightmost column when the content overflows.

use treeline_core::buffer::{Buffer, Cell};
use treeline_core::geometry::Rect;
use treeline_core::style::Style;

use crate::apply_style;

/// Mutable state of the scrollbar indicator, in content rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollbarState {
    /// Total number of scrollable content rows.
    pub content_length: usize,
    /// Current scroll position within the content.
    pub position: usize,
    /// Number of rows visible in the viewport.
    pub viewport_length: usize,
}

impl ScrollbarState {
    /// Create a state with the given content, position, and viewport sizes.
    #[must_use]
    pub fn new(content_length: usize, position: usize, viewport_length: usize) -> Self {
        Self {
            content_length,
            position,
            viewport_length,
        }
    }

    /// Overwrite all three measurements at once.
    pub(crate) fn sync(&mut self, content_length: usize, position: usize, viewport_length: usize) {
        self.content_length = content_length;
        self.position = position;
        self.viewport_length = viewport_length;
    }

    /// Whether the content overflows the viewport.
    #[must_use]
    pub fn overflowing(&self) -> bool {
        self.content_length > self.viewport_length
    }

    /// Thumb placement on a track of `track_len` cells: `(offset, size)`.
    /// `None` when there is nothing to indicate.
    pub(crate) fn thumb(&self, track_len: u16) -> Option<(u16, u16)> {
        if track_len == 0 || self.content_length == 0 {
            return None;
        }
        let track = track_len as f64;
        let viewport_ratio = self.viewport_length as f64 / self.content_length as f64;
        let size = ((track * viewport_ratio).round().max(1.0) as u16).min(track_len);

        let max_pos = self.content_length.saturating_sub(self.viewport_length);
        let pos_ratio = if max_pos == 0 {
            0.0
        } else {
            self.position.min(max_pos) as f64 / max_pos as f64
        };
        let available = track_len - size;
        let offset = (f64::from(available) * pos_ratio).round() as u16;
        Some((offset, size))
    }
}

/// Draw a vertical scrollbar into `area` (the track is `area.height` cells
/// tall, drawn in `area`'s leftmost column).
pub(crate) fn render_scrollbar(
    buf: &mut Buffer,
    area: Rect,
    state: &ScrollbarState,
    thumb_style: Style,
    track_style: Style,
) {
    if area.is_empty() {
        return;
    }
    let Some((thumb_offset, thumb_size)) = state.thumb(area.height) else {
        return;
    };
    for i in 0..area.height {
        let is_thumb = i >= thumb_offset && i < thumb_offset + thumb_size;
        let (ch, style) = if is_thumb {
            ('█', thumb_style)
        } else {
            ('│', track_style)
        };
        let mut cell = Cell::from_char(ch);
        apply_style(&mut cell, style);
        buf.set(area.x, area.y + i, cell);
    }
}
