//! Two-finger scale (pinch) gesture detection over raw pointer events.
//!
//! The host feeds every touch event it receives through `ScaleDetector::handle`
//! and reacts to the `ScaleEvent`s it emits. Only the first two live pointers
//! form a gesture; extra fingers are tracked but ignored until one of the
//! gesture pointers lifts.

/// What happened to a pointer in this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Down,
    Move,
    /// Any pointer lifting, last finger or not.
    Up,
    /// The platform abandoned the whole touch stream.
    Cancel,
}

/// One raw multi-touch event, in chronological order.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub id: u64,
    pub phase: Phase,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(id: u64, phase: Phase, x: f32, y: f32) -> Self {
        Self { id, phase, x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleEvent {
    Begin,
    /// Incremental factor: current finger span / previous finger span.
    /// Greater than 1.0 while the fingers separate.
    Scale(f32),
    End,
}

/// Finger spans below this are too degenerate to produce a factor.
const MIN_SPAN: f32 = 1.0;

struct Gesture {
    a: u64,
    b: u64,
    last_span: f32,
}

#[derive(Default)]
pub struct ScaleDetector {
    /// Live pointers in press order.
    pointers: Vec<(u64, f32, f32)>,
    gesture: Option<Gesture>,
}

impl ScaleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Option<ScaleEvent> {
        match event.phase {
            Phase::Down => {
                if self.pointers.iter().all(|&(id, _, _)| id != event.id) {
                    self.pointers.push((event.id, event.x, event.y));
                }
                self.try_begin()
            }
            Phase::Move => {
                if let Some(p) = self.pointers.iter_mut().find(|p| p.0 == event.id) {
                    p.1 = event.x;
                    p.2 = event.y;
                }
                let member = self
                    .gesture
                    .as_ref()
                    .map(|g| g.a == event.id || g.b == event.id);
                match member {
                    // Two fingers may be live without a gesture (the pair
                    // re-forms lazily after a third-finger shuffle).
                    None => self.try_begin(),
                    Some(false) => None,
                    Some(true) => {
                        let span = self.current_span()?;
                        let g = self.gesture.as_mut()?;
                        if g.last_span > MIN_SPAN && span > MIN_SPAN {
                            let factor = span / g.last_span;
                            g.last_span = span;
                            Some(ScaleEvent::Scale(factor))
                        } else {
                            g.last_span = span;
                            None
                        }
                    }
                }
            }
            Phase::Up => {
                self.pointers.retain(|&(id, _, _)| id != event.id);
                let was_member = self
                    .gesture
                    .as_ref()
                    .is_some_and(|g| g.a == event.id || g.b == event.id);
                if was_member {
                    self.gesture = None;
                    Some(ScaleEvent::End)
                } else {
                    None
                }
            }
            Phase::Cancel => {
                self.pointers.clear();
                let was_active = self.gesture.take().is_some();
                was_active.then_some(ScaleEvent::End)
            }
        }
    }

    /// Start a gesture from the two earliest live pointers, if possible.
    fn try_begin(&mut self) -> Option<ScaleEvent> {
        if self.gesture.is_some() || self.pointers.len() < 2 {
            return None;
        }
        let (a, ax, ay) = self.pointers[0];
        let (b, bx, by) = self.pointers[1];
        let span = distance(ax, ay, bx, by);
        self.gesture = Some(Gesture { a, b, last_span: span });
        Some(ScaleEvent::Begin)
    }

    fn current_span(&self) -> Option<f32> {
        let g = self.gesture.as_ref()?;
        let pa = self.pointers.iter().find(|p| p.0 == g.a)?;
        let pb = self.pointers.iter().find(|p| p.0 == g.b)?;
        Some(distance(pa.1, pa.2, pb.1, pb.2))
    }
}

fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(id: u64, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(id, Phase::Down, x, y)
    }

    fn mv(id: u64, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(id, Phase::Move, x, y)
    }

    fn up(id: u64, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(id, Phase::Up, x, y)
    }

    #[test]
    fn begins_on_second_finger_and_ends_on_lift() {
        let mut det = ScaleDetector::new();
        assert_eq!(det.handle(down(1, 0.0, 0.0)), None);
        assert!(!det.is_active());
        assert_eq!(det.handle(down(2, 100.0, 0.0)), Some(ScaleEvent::Begin));
        assert!(det.is_active());
        assert_eq!(det.handle(up(2, 100.0, 0.0)), Some(ScaleEvent::End));
        assert!(!det.is_active());
    }

    #[test]
    fn reports_incremental_factors() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 0.0, 0.0));
        det.handle(down(2, 100.0, 0.0));

        // Fingers separate: 100 -> 200
        match det.handle(mv(2, 200.0, 0.0)) {
            Some(ScaleEvent::Scale(f)) => assert!((f - 2.0).abs() < 1e-4),
            other => panic!("expected scale, got {:?}", other),
        }
        // Fingers converge: 200 -> 100
        match det.handle(mv(2, 100.0, 0.0)) {
            Some(ScaleEvent::Scale(f)) => assert!((f - 0.5).abs() < 1e-4),
            other => panic!("expected scale, got {:?}", other),
        }
    }

    #[test]
    fn single_finger_moves_produce_nothing() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 0.0, 0.0));
        assert_eq!(det.handle(mv(1, 50.0, 50.0)), None);
        assert_eq!(det.handle(up(1, 50.0, 50.0)), None);
    }

    #[test]
    fn third_finger_does_not_join() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 0.0, 0.0));
        det.handle(down(2, 100.0, 0.0));
        assert_eq!(det.handle(down(3, 500.0, 500.0)), None);
        assert_eq!(det.handle(mv(3, 900.0, 900.0)), None);
        assert!(det.is_active());
    }

    #[test]
    fn gesture_reforms_after_member_lift() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 0.0, 0.0));
        det.handle(down(2, 100.0, 0.0));
        det.handle(down(3, 0.0, 100.0));
        assert_eq!(det.handle(up(1, 0.0, 0.0)), Some(ScaleEvent::End));
        // Remaining two pointers pair up on the next move
        assert_eq!(det.handle(mv(2, 100.0, 10.0)), Some(ScaleEvent::Begin));
        assert!(matches!(
            det.handle(mv(2, 100.0, 50.0)),
            Some(ScaleEvent::Scale(_))
        ));
    }

    #[test]
    fn cancel_clears_everything() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 0.0, 0.0));
        det.handle(down(2, 100.0, 0.0));
        assert_eq!(
            det.handle(PointerEvent::new(1, Phase::Cancel, 0.0, 0.0)),
            Some(ScaleEvent::End)
        );
        assert!(!det.is_active());
        // A lone new finger must not resurrect stale pointers
        assert_eq!(det.handle(down(4, 0.0, 0.0)), None);
    }

    #[test]
    fn degenerate_span_is_skipped() {
        let mut det = ScaleDetector::new();
        det.handle(down(1, 10.0, 10.0));
        det.handle(down(2, 10.2, 10.0));
        // Span below the minimum: no factor until the fingers part
        assert_eq!(det.handle(mv(2, 10.4, 10.0)), None);
        assert!(matches!(
            det.handle(mv(2, 80.0, 10.0)),
            Some(ScaleEvent::Scale(_)) | None
        ));
    }
}
