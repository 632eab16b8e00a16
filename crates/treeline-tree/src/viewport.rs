//! Render-strategy selection and visible-range bookkeeping.
//!
//! The viewport owns the scroll offset (in rows), translates between
//! pointer coordinates and row indices, and keeps the [`ScrollbarState`]
//! synchronized. Rows have a fixed per-tree height so the visible range and
//! animation-segment heights are computable without laying out hidden rows.

use std::ops::Range;

use crate::scrollbar::ScrollbarState;

/// How the tree lays out and scrolls its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    /// Every visible row is rendered; the tree never scrolls itself.
    #[default]
    Plain,
    /// The tree scrolls within its area and shows a scrollbar.
    Scrollable,
    /// Fixed-height virtualization: only the rows in view are rendered.
    Virtual,
}

/// Scroll state and row geometry for one tree.
#[derive(Debug, Clone)]
pub(crate) struct Viewport {
    strategy: RenderStrategy,
    row_height: u16,
    height: u16,
    scroll_offset: usize,
    pub(crate) scrollbar: ScrollbarState,
}

impl Viewport {
    pub(crate) fn new(strategy: RenderStrategy, row_height: u16) -> Self {
        Self {
            strategy,
            row_height: row_height.max(1),
            height: 0,
            scroll_offset: 0,
            scrollbar: ScrollbarState::default(),
        }
    }

    pub(crate) fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    pub(crate) fn is_virtual(&self) -> bool {
        self.strategy == RenderStrategy::Virtual
    }

    pub(crate) fn row_height(&self) -> u16 {
        self.row_height
    }

    pub(crate) fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub(crate) fn set_height(&mut self, height: u16) {
        self.height = height;
    }

    /// Whole rows that fit in the viewport.
    pub(crate) fn rows_fit(&self) -> usize {
        (self.height / self.row_height) as usize
    }

    /// Rows an animation segment may need to cover the viewport: one
    /// viewport's worth rounded up, plus one for the partially visible row.
    pub(crate) fn motion_rows(&self) -> usize {
        (self.height as usize).div_ceil(self.row_height as usize) + 1
    }

    fn max_offset(&self, total: usize) -> usize {
        total.saturating_sub(self.rows_fit())
    }

    /// Clamp the offset after the row count shrank.
    pub(crate) fn clamp(&mut self, total: usize) {
        self.scroll_offset = self.scroll_offset.min(self.max_offset(total));
    }

    /// Scroll by `delta` rows (positive = down). A plain tree never scrolls.
    pub(crate) fn scroll(&mut self, delta: i32, total: usize) {
        if self.strategy == RenderStrategy::Plain {
            return;
        }
        let next = (self.scroll_offset as i64 + i64::from(delta))
            .max(0)
            .min(self.max_offset(total) as i64);
        self.scroll_offset = next as usize;
    }

    /// Adjust the offset so the row at `idx` is in view.
    pub(crate) fn ensure_visible(&mut self, idx: usize, total: usize) {
        if self.strategy == RenderStrategy::Plain {
            return;
        }
        let fit = self.rows_fit();
        if idx < self.scroll_offset {
            self.scroll_offset = idx;
        } else if fit > 0 && idx >= self.scroll_offset + fit {
            self.scroll_offset = (idx + 1 - fit).min(self.max_offset(total));
        }
    }

    /// Row indices to render for `total` content rows.
    pub(crate) fn visible_range(&self, total: usize) -> Range<usize> {
        match self.strategy {
            RenderStrategy::Plain => 0..total.min(self.rows_fit()),
            RenderStrategy::Scrollable | RenderStrategy::Virtual => {
                let start = self.scroll_offset.min(total);
                let end = (start + self.rows_fit()).min(total);
                start..end
            }
        }
    }

    /// Map a y offset within the tree's area to `(row index, offset within
    /// the row)`.
    pub(crate) fn row_at(&self, y: u16, total: usize) -> Option<(usize, u16)> {
        let row = self.scroll_offset + (y / self.row_height) as usize;
        (row < total).then_some((row, y % self.row_height))
    }

    /// Refresh the scrollbar from the current content and scroll state.
    pub(crate) fn sync(&mut self, content_rows: usize) {
        self.clamp(content_rows);
        self.scrollbar
            .sync(content_rows, self.scroll_offset, self.rows_fit());
    }

    /// Whether the scrollbar column should be reserved.
    pub(crate) fn wants_scrollbar(&self, total: usize) -> bool {
        self.strategy != RenderStrategy::Plain && total > self.rows_fit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(strategy: RenderStrategy) -> Viewport {
        let mut v = Viewport::new(strategy, 1);
        v.set_height(10);
        v
    }

    #[test]
    fn plain_never_scrolls() {
        let mut v = viewport(RenderStrategy::Plain);
        v.scroll(5, 100);
        assert_eq!(v.scroll_offset(), 0);
        assert_eq!(v.visible_range(100), 0..10);
        assert_eq!(v.visible_range(4), 0..4);
        assert!(!v.wants_scrollbar(100));
    }

    #[test]
    fn scroll_clamps_to_content() {
        let mut v = viewport(RenderStrategy::Virtual);
        v.scroll(-3, 50);
        assert_eq!(v.scroll_offset(), 0);
        v.scroll(100, 50);
        assert_eq!(v.scroll_offset(), 40);
        assert_eq!(v.visible_range(50), 40..50);
    }

    #[test]
    fn ensure_visible_scrolls_both_directions() {
        let mut v = viewport(RenderStrategy::Scrollable);
        v.scroll(20, 50);
        v.ensure_visible(5, 50);
        assert_eq!(v.scroll_offset(), 5);
        v.ensure_visible(30, 50);
        assert_eq!(v.scroll_offset(), 21);
        // Already in view: no movement.
        v.ensure_visible(25, 50);
        assert_eq!(v.scroll_offset(), 21);
    }

    #[test]
    fn row_at_maps_taller_rows() {
        let mut v = Viewport::new(RenderStrategy::Virtual, 3);
        v.set_height(9);
        v.scroll(2, 10);
        assert_eq!(v.row_at(0, 10), Some((2, 0)));
        assert_eq!(v.row_at(4, 10), Some((3, 1)));
        assert_eq!(v.row_at(8, 10), Some((4, 2)));
    }

    #[test]
    fn row_at_rejects_past_content() {
        let v = viewport(RenderStrategy::Virtual);
        assert_eq!(v.row_at(2, 5), Some((2, 0)));
        assert_eq!(v.row_at(7, 5), None);
    }

    #[test]
    fn motion_rows_rounds_up_plus_one() {
        let mut v = Viewport::new(RenderStrategy::Virtual, 3);
        v.set_height(10);
        // ceil(10 / 3) + 1
        assert_eq!(v.motion_rows(), 5);
        v.set_height(9);
        assert_eq!(v.motion_rows(), 4);
    }

    #[test]
    fn sync_updates_scrollbar_and_clamps() {
        let mut v = viewport(RenderStrategy::Virtual);
        v.scroll(40, 50);
        // Content shrank below the old offset.
        v.sync(20);
        assert_eq!(v.scroll_offset(), 10);
        assert_eq!(v.scrollbar, ScrollbarState::new(20, 10, 10));
    }

    #[test]
    fn wants_scrollbar_only_on_overflow() {
        let v = viewport(RenderStrategy::Scrollable);
        assert!(v.wants_scrollbar(11));
        assert!(!v.wants_scrollbar(10));
    }
}
