//! Pinch-to-zoom control of a grid's column count.
//!
//! A `SpanZoomController` feeds raw touch events through a [`ScaleDetector`]
//! and turns pinch gestures into column-count transitions on a [`SpanGrid`]:
//! pinch in (fingers converging) fits one more column, pinch out fits one
//! fewer. At most one transition is committed per gesture. The grid keeps its
//! scroll anchor across the relayout, and every committed change is reported
//! through the `on_span_changed` callback so the host can persist it.

use crate::gesture::{PointerEvent, ScaleDetector, ScaleEvent};

/// Layout surface the controller drives. `first_visible_index` and
/// `item_offset` feed the scroll anchor captured around a column change;
/// `scroll_to_with_offset` restores it after `request_relayout`.
pub trait SpanGrid {
    fn column_count(&self) -> usize;
    fn set_column_count(&mut self, span: usize);
    fn first_visible_index(&self) -> usize;
    /// Pixel offset of the item's top edge from the viewport top
    /// (zero or negative when scrolled partway past it).
    fn item_offset(&self, index: usize) -> f32;
    fn scroll_to_with_offset(&mut self, index: usize, offset: f32);
    fn request_relayout(&mut self);
}

/// How far the accumulated scale must drift from 1.0 before a step commits.
pub const DEFAULT_THRESHOLD: f32 = 0.15;

pub struct SpanZoomConfig {
    pub min_span: usize,
    pub max_span: usize,
    pub initial_span: usize,
    /// Non-empty enables discrete mode: the span only takes these values,
    /// stepped by position. Must be ascending.
    pub allowed_spans: Vec<usize>,
    pub threshold: f32,
}

impl Default for SpanZoomConfig {
    fn default() -> Self {
        Self {
            min_span: 2,
            max_span: 6,
            initial_span: 4,
            allowed_spans: Vec::new(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Transient state for one pinch, created on gesture begin and dropped on
/// end or cancel.
struct GestureSession {
    accumulated: f32,
    committed: bool,
    start_span: usize,
}

impl GestureSession {
    fn begin(start_span: usize) -> Self {
        Self {
            accumulated: 1.0,
            committed: false,
            start_span,
        }
    }
}

pub struct SpanZoomController {
    detector: ScaleDetector,
    session: Option<GestureSession>,
    current: usize,
    min_span: usize,
    max_span: usize,
    allowed: Vec<usize>,
    threshold: f32,
    on_span_changed: Box<dyn FnMut(usize)>,
}

impl SpanZoomController {
    pub fn new(config: SpanZoomConfig, on_span_changed: impl FnMut(usize) + 'static) -> Self {
        let mut controller = Self {
            detector: ScaleDetector::new(),
            session: None,
            current: 0,
            min_span: config.min_span.max(1),
            max_span: config.max_span.max(config.min_span.max(1)),
            allowed: config.allowed_spans,
            threshold: config.threshold,
            on_span_changed: Box::new(on_span_changed),
        };
        controller.current = controller.snap(config.initial_span);
        controller
    }

    pub fn span_count(&self) -> usize {
        self.current
    }

    /// True while a pinch is in progress. Hosts use this to drop item taps
    /// that arrive mid-gesture.
    pub fn is_gesture_active(&self) -> bool {
        self.detector.is_active()
    }

    /// Feed one raw touch event. Must be called for every touch event the
    /// host surface receives, including up/cancel. Returns true while a
    /// pinch gesture is in progress.
    pub fn handle_touch(&mut self, event: PointerEvent, grid: &mut dyn SpanGrid) -> bool {
        match self.detector.handle(event) {
            Some(ScaleEvent::Begin) => {
                self.session = Some(GestureSession::begin(self.current));
            }
            Some(ScaleEvent::Scale(factor)) => self.on_scale(factor, grid),
            Some(ScaleEvent::End) => {
                self.session = None;
            }
            None => {}
        }
        self.detector.is_active()
    }

    fn on_scale(&mut self, factor: f32, grid: &mut dyn SpanGrid) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // One transition per gesture: once committed, the rest of the pinch
        // is ignored so a long drag cannot ratchet through several counts.
        if session.committed {
            return;
        }
        session.accumulated *= factor;

        let accumulated = session.accumulated;
        let start_span = session.start_span;

        let target = if accumulated < 1.0 - self.threshold {
            // Fingers converging: zoom out, one more column fits.
            Some(self.step(start_span, 1))
        } else if accumulated > 1.0 + self.threshold {
            // Fingers separating: zoom in, one fewer column.
            Some(self.step(start_span, -1))
        } else {
            None
        };

        if let Some(target) = target {
            self.session.as_mut().unwrap().accumulated = 1.0;
            if target != self.current {
                self.session.as_mut().unwrap().committed = true;
                self.apply_span_count(grid, target);
            }
        }
    }

    /// One step from `from`, in column-count direction (`+1` = more columns).
    fn step(&self, from: usize, direction: isize) -> usize {
        if self.allowed.is_empty() {
            let next = from as isize + direction;
            next.clamp(self.min_span as isize, self.max_span as isize) as usize
        } else {
            let pos = self
                .allowed
                .iter()
                .position(|&s| s == from)
                .unwrap_or_else(|| self.nearest_allowed_index(from));
            let next = (pos as isize + direction).clamp(0, self.allowed.len() as isize - 1);
            self.allowed[next as usize]
        }
    }

    /// Commit a column-count change: capture the scroll anchor, relayout,
    /// restore the anchor, then notify. No-op when the span is unchanged.
    pub fn apply_span_count(&mut self, grid: &mut dyn SpanGrid, new_span: usize) {
        if new_span == self.current {
            return;
        }
        let anchor_index = grid.first_visible_index();
        let anchor_offset = grid.item_offset(anchor_index);

        self.current = new_span;
        grid.set_column_count(new_span);
        grid.request_relayout();
        grid.scroll_to_with_offset(anchor_index, anchor_offset);

        (self.on_span_changed)(new_span);
    }

    /// External override, e.g. restoring a persisted value. The input is
    /// clamped to bounds (or snapped to the nearest allowed value) and
    /// applied immediately.
    pub fn set_span_count(&mut self, grid: &mut dyn SpanGrid, span: usize) {
        let snapped = self.snap(span);
        self.apply_span_count(grid, snapped);
    }

    /// Step one value in column-count direction (`+1` = more columns),
    /// honoring the allowed set. Keyboard counterpart of a pinch.
    pub fn step_span_count(&mut self, grid: &mut dyn SpanGrid, direction: isize) {
        let target = self.step(self.current, direction);
        self.apply_span_count(grid, target);
    }

    fn snap(&self, span: usize) -> usize {
        if self.allowed.is_empty() {
            span.clamp(self.min_span, self.max_span)
        } else {
            self.allowed[self.nearest_allowed_index(span)]
        }
    }

    fn nearest_allowed_index(&self, span: usize) -> usize {
        self.allowed
            .iter()
            .enumerate()
            .min_by_key(|&(_, &s)| s.abs_diff(span))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Phase;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Minimal grid double: one row per `columns` items, fixed row height.
    struct TestGrid {
        columns: usize,
        scroll_y: f32,
        row_height: f32,
        relayouts: usize,
        scroll_calls: Vec<(usize, f32)>,
    }

    impl TestGrid {
        fn new(columns: usize) -> Self {
            Self {
                columns,
                scroll_y: 0.0,
                row_height: 100.0,
                relayouts: 0,
                scroll_calls: Vec::new(),
            }
        }
    }

    impl SpanGrid for TestGrid {
        fn column_count(&self) -> usize {
            self.columns
        }

        fn set_column_count(&mut self, span: usize) {
            self.columns = span;
        }

        fn first_visible_index(&self) -> usize {
            (self.scroll_y / self.row_height).floor() as usize * self.columns
        }

        fn item_offset(&self, index: usize) -> f32 {
            let row = index / self.columns;
            row as f32 * self.row_height - self.scroll_y
        }

        fn scroll_to_with_offset(&mut self, index: usize, offset: f32) {
            let row = index / self.columns;
            self.scroll_y = row as f32 * self.row_height - offset;
            self.scroll_calls.push((index, offset));
        }

        fn request_relayout(&mut self) {
            self.relayouts += 1;
        }
    }

    fn discrete_controller(changes: Rc<RefCell<Vec<usize>>>) -> SpanZoomController {
        SpanZoomController::new(
            SpanZoomConfig {
                min_span: 2,
                max_span: 9,
                initial_span: 4,
                allowed_spans: vec![2, 3, 4, 5, 6, 9],
                threshold: 0.15,
            },
            move |span| changes.borrow_mut().push(span),
        )
    }

    /// Drive a full pinch whose finger span goes from 100px to `to`px.
    fn pinch(controller: &mut SpanZoomController, grid: &mut TestGrid, to: f32) {
        controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Move, to, 0.0), grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Up, to, 0.0), grid);
        controller.handle_touch(PointerEvent::new(1, Phase::Up, 0.0, 0.0), grid);
    }

    #[test]
    fn pinch_in_steps_to_next_allowed_value_once() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), &mut grid);
        // Accumulated scale 0.80, below the 0.85 threshold: 4 -> 5.
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 80.0, 0.0), &mut grid);
        assert_eq!(controller.span_count(), 5);
        // Scale keeps dropping to 0.60 within the same gesture: no second step.
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 60.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Up, 60.0, 0.0), &mut grid);

        assert_eq!(controller.span_count(), 5);
        assert_eq!(*changes.borrow(), vec![5]);
        assert_eq!(grid.column_count(), 5);
    }

    #[test]
    fn pinch_out_steps_toward_fewer_columns() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        pinch(&mut controller, &mut grid, 130.0);
        assert_eq!(controller.span_count(), 3);
        assert_eq!(*changes.borrow(), vec![3]);
    }

    #[test]
    fn discrete_steps_follow_the_allowed_sequence() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        for _ in 0..5 {
            pinch(&mut controller, &mut grid, 70.0);
        }
        // 4 -> 5 -> 6 -> 9, then clamped at the last allowed value.
        assert_eq!(*changes.borrow(), vec![5, 6, 9]);
        assert_eq!(controller.span_count(), 9);
    }

    #[test]
    fn continuous_mode_clamps_at_bounds_without_callback() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let mut controller = SpanZoomController::new(
            SpanZoomConfig {
                min_span: 2,
                max_span: 6,
                initial_span: 6,
                ..SpanZoomConfig::default()
            },
            move |span| sink.borrow_mut().push(span),
        );
        let mut grid = TestGrid::new(6);

        // Already at max columns; pinch-in must be a clamped no-op.
        pinch(&mut controller, &mut grid, 70.0);
        assert_eq!(controller.span_count(), 6);
        assert!(changes.borrow().is_empty());
        assert_eq!(grid.relayouts, 0);
    }

    #[test]
    fn continuous_mode_steps_by_one() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let mut controller = SpanZoomController::new(
            SpanZoomConfig::default(),
            move |span| sink.borrow_mut().push(span),
        );
        let mut grid = TestGrid::new(4);

        pinch(&mut controller, &mut grid, 70.0);
        pinch(&mut controller, &mut grid, 140.0);
        pinch(&mut controller, &mut grid, 140.0);
        assert_eq!(*changes.borrow(), vec![5, 4, 3]);
    }

    #[test]
    fn cancel_before_threshold_commits_nothing() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 95.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(1, Phase::Cancel, 0.0, 0.0), &mut grid);

        assert_eq!(controller.span_count(), 4);
        assert!(changes.borrow().is_empty());

        // The next gesture starts from a fresh accumulator: 0.9 * 0.9 would
        // cross the threshold if state leaked across gestures.
        controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 90.0, 0.0), &mut grid);
        assert_eq!(controller.span_count(), 4);
    }

    #[test]
    fn handle_touch_reports_gesture_in_progress() {
        let mut controller = discrete_controller(Rc::new(RefCell::new(Vec::new())));
        let mut grid = TestGrid::new(4);

        assert!(!controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), &mut grid));
        assert!(controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), &mut grid));
        assert!(controller.handle_touch(PointerEvent::new(2, Phase::Move, 90.0, 0.0), &mut grid));
        assert!(!controller.handle_touch(PointerEvent::new(2, Phase::Up, 90.0, 0.0), &mut grid));
    }

    #[test]
    fn scroll_anchor_survives_a_span_change() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes);
        let mut grid = TestGrid::new(controller.span_count());
        // Scrolled partway into row 5: first visible item 20, 40px past its top.
        grid.scroll_y = 540.0;
        assert_eq!(grid.first_visible_index(), 20);
        assert_eq!(grid.item_offset(20), -40.0);

        pinch(&mut controller, &mut grid, 70.0);

        assert_eq!(grid.scroll_calls, vec![(20, -40.0)]);
        // Item 20 heads row 4 of the 5-column layout; same offset as before.
        assert_eq!(grid.first_visible_index(), 20);
        assert_eq!(grid.item_offset(20), -40.0);
        assert_eq!(grid.relayouts, 1);
    }

    #[test]
    fn apply_same_span_is_a_no_op() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        controller.apply_span_count(&mut grid, 4);
        assert!(changes.borrow().is_empty());
        assert_eq!(grid.relayouts, 0);
        assert!(grid.scroll_calls.is_empty());
    }

    #[test]
    fn set_span_count_clamps_arbitrary_input() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        controller.set_span_count(&mut grid, 7);
        assert_eq!(controller.span_count(), 6);
        controller.set_span_count(&mut grid, 100);
        assert_eq!(controller.span_count(), 9);
        controller.set_span_count(&mut grid, 0);
        assert_eq!(controller.span_count(), 2);
        assert_eq!(*changes.borrow(), vec![6, 9, 2]);

        let sink = Rc::new(RefCell::new(Vec::new()));
        let probe = sink.clone();
        let mut continuous = SpanZoomController::new(
            SpanZoomConfig::default(),
            move |span| probe.borrow_mut().push(span),
        );
        continuous.set_span_count(&mut grid, 100);
        assert_eq!(continuous.span_count(), 6);
        continuous.set_span_count(&mut grid, 0);
        assert_eq!(continuous.span_count(), 2);
        assert_eq!(*sink.borrow(), vec![6, 2]);
    }

    #[test]
    fn step_span_count_walks_the_allowed_sequence() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = discrete_controller(changes.clone());
        let mut grid = TestGrid::new(controller.span_count());

        controller.step_span_count(&mut grid, 1);
        controller.step_span_count(&mut grid, 1);
        controller.step_span_count(&mut grid, 1);
        controller.step_span_count(&mut grid, 1);
        assert_eq!(controller.span_count(), 9);
        controller.step_span_count(&mut grid, -1);
        assert_eq!(*changes.borrow(), vec![5, 6, 9, 6]);
    }

    #[test]
    fn initial_span_snaps_to_nearest_allowed_value() {
        let controller = SpanZoomController::new(
            SpanZoomConfig {
                min_span: 2,
                max_span: 9,
                initial_span: 8,
                allowed_spans: vec![2, 3, 4, 5, 6, 9],
                threshold: 0.15,
            },
            |_| {},
        );
        assert_eq!(controller.span_count(), 9);

        let controller = SpanZoomController::new(
            SpanZoomConfig {
                initial_span: 0,
                allowed_spans: vec![2, 3, 4],
                ..SpanZoomConfig::default()
            },
            |_| {},
        );
        assert_eq!(controller.span_count(), 2);
    }

    #[test]
    fn clamped_crossing_does_not_consume_the_gesture() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let mut controller = SpanZoomController::new(
            SpanZoomConfig {
                initial_span: 6,
                ..SpanZoomConfig::default()
            },
            move |span| sink.borrow_mut().push(span),
        );
        let mut grid = TestGrid::new(6);

        controller.handle_touch(PointerEvent::new(1, Phase::Down, 0.0, 0.0), &mut grid);
        controller.handle_touch(PointerEvent::new(2, Phase::Down, 100.0, 0.0), &mut grid);
        // Pinch in at max columns: clamped, nothing committed.
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 80.0, 0.0), &mut grid);
        assert_eq!(controller.span_count(), 6);
        // Reverse direction within the same gesture: 80 -> 120px crosses the
        // pinch-out threshold and still gets its one transition.
        controller.handle_touch(PointerEvent::new(2, Phase::Move, 120.0, 0.0), &mut grid);
        assert_eq!(controller.span_count(), 5);
        assert_eq!(*changes.borrow(), vec![5]);
    }
}
