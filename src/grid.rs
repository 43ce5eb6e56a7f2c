//! Geometry model for a scrollable thumbnail grid with a mutable column
//! count. The view reads cell size and spacing from here; the pinch
//! controller drives it through the [`SpanGrid`] trait. Scroll restoration
//! and relayout are recorded as pending work the app drains after the
//! update that changed the span, once the new layout is in effect.

use crate::span_zoom::SpanGrid;

/// Detail overlays (labels, counts) are drawn only at this column count or
/// below; denser grids show bare thumbnails.
pub const DETAIL_SPAN_LIMIT: usize = 6;

const DEFAULT_VIEWPORT: (f32, f32) = (1280.0, 720.0);

pub struct GridModel {
    columns: usize,
    item_count: usize,
    viewport_width: f32,
    viewport_height: f32,
    scroll_y: f32,
    base_spacing: f32,
    padding: f32,
    pending_scroll: Option<f32>,
    needs_relayout: bool,
}

impl GridModel {
    pub fn new(columns: usize, base_spacing: f32, padding: f32) -> Self {
        Self {
            columns: columns.max(1),
            item_count: 0,
            viewport_width: DEFAULT_VIEWPORT.0,
            viewport_height: DEFAULT_VIEWPORT.1,
            scroll_y: 0.0,
            base_spacing,
            padding,
            pending_scroll: None,
            needs_relayout: false,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width.max(1.0);
        self.viewport_height = height.max(1.0);
    }

    pub fn set_scroll(&mut self, y: f32) {
        self.scroll_y = y;
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Item spacing for the current column count. Denser grids get
    /// proportionally tighter gutters.
    pub fn spacing(&self) -> f32 {
        match self.columns {
            0..=3 => self.base_spacing,
            4 => self.base_spacing * 0.75,
            5 => self.base_spacing * 0.5,
            _ => self.base_spacing * 0.35,
        }
    }

    /// Square cell edge for the current viewport width and column count.
    pub fn cell_size(&self) -> f32 {
        let cols = self.columns as f32;
        let usable = self.viewport_width - self.padding * 2.0 - self.spacing() * (cols - 1.0);
        (usable / cols).max(1.0)
    }

    /// Whether per-item detail overlays are drawn at this density.
    pub fn show_details(&self) -> bool {
        self.columns <= DETAIL_SPAN_LIMIT
    }

    pub fn take_pending_scroll(&mut self) -> Option<f32> {
        self.pending_scroll.take()
    }

    pub fn take_relayout(&mut self) -> bool {
        std::mem::take(&mut self.needs_relayout)
    }

    fn row_height(&self) -> f32 {
        self.cell_size() + self.spacing()
    }

    fn row_of(&self, index: usize) -> usize {
        index / self.columns
    }

    fn row_top(&self, row: usize) -> f32 {
        self.padding + row as f32 * self.row_height()
    }

    fn row_count(&self) -> usize {
        self.item_count.div_ceil(self.columns)
    }

    pub fn content_height(&self) -> f32 {
        let rows = self.row_count();
        if rows == 0 {
            return self.padding * 2.0;
        }
        self.padding * 2.0 + rows as f32 * self.row_height() - self.spacing()
    }

    fn max_scroll(&self) -> f32 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Scroll just far enough that `index` is fully visible. Returns the new
    /// scroll offset when a move was needed.
    pub fn reveal(&mut self, index: usize) -> Option<f32> {
        let top = self.row_top(self.row_of(index));
        let bottom = top + self.cell_size();

        let target = if top < self.scroll_y {
            top - self.padding
        } else if bottom > self.scroll_y + self.viewport_height {
            bottom + self.padding - self.viewport_height
        } else {
            return None;
        };

        self.scroll_y = target.clamp(0.0, self.max_scroll());
        self.pending_scroll = Some(self.scroll_y);
        Some(self.scroll_y)
    }
}

impl SpanGrid for GridModel {
    fn column_count(&self) -> usize {
        self.columns
    }

    fn set_column_count(&mut self, span: usize) {
        self.columns = span.max(1);
    }

    fn first_visible_index(&self) -> usize {
        if self.item_count == 0 {
            return 0;
        }
        let row = ((self.scroll_y - self.padding) / self.row_height()).floor();
        let row = (row.max(0.0)) as usize;
        (row * self.columns).min(self.item_count - 1)
    }

    fn item_offset(&self, index: usize) -> f32 {
        self.row_top(self.row_of(index)) - self.scroll_y
    }

    fn scroll_to_with_offset(&mut self, index: usize, offset: f32) {
        let target = self.row_top(self.row_of(index)) - offset;
        self.scroll_y = target.clamp(0.0, self.max_scroll());
        self.pending_scroll = Some(self.scroll_y);
    }

    fn request_relayout(&mut self) {
        self.needs_relayout = true;
    }
}
