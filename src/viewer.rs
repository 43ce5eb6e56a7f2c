use std::time::Instant;

const CROSSFADE_MS: f32 = 250.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 8.0;
const ZOOM_STEP: f32 = 1.5;

/// Full-screen viewer state: which photo is open, the crossfade from the
/// previous one, and keyboard-driven zoom.
pub struct ViewerState {
    pub current: Option<usize>,
    pub fade: Option<Crossfade>,
    pub show_info: bool,
    pub zoom: Zoom,
}

pub struct Crossfade {
    pub from_index: usize,
    pub start: Instant,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current: None,
            fade: None,
            show_info: false,
            zoom: Zoom::default(),
        }
    }
}

impl ViewerState {
    pub fn open(&mut self, index: usize) {
        self.current = Some(index);
        self.fade = None;
        self.zoom.reset();
    }

    pub fn close(&mut self) {
        self.current = None;
        self.fade = None;
        self.zoom.reset();
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn toggle_info(&mut self) {
        self.show_info = !self.show_info;
    }

    pub fn next(&mut self, total: usize) {
        if let Some(i) = self.current {
            if i + 1 < total {
                self.navigate(i + 1);
            }
        }
    }

    pub fn prev(&mut self) {
        if let Some(i) = self.current {
            if i > 0 {
                self.navigate(i - 1);
            }
        }
    }

    /// Jump straight to an index (filmstrip click).
    pub fn jump(&mut self, index: usize, total: usize) {
        if self.current.is_some() && index < total {
            self.navigate(index);
        }
    }

    fn navigate(&mut self, new_index: usize) {
        let Some(old_index) = self.current else {
            return;
        };
        if old_index == new_index {
            return;
        }
        self.fade = Some(Crossfade {
            from_index: old_index,
            start: Instant::now(),
        });
        self.current = Some(new_index);
        self.zoom.reset();
    }

    /// Crossfade progress: 0.0 just started, 1.0 finished. None when idle.
    pub fn fade_progress(&self) -> Option<f32> {
        let fade = self.fade.as_ref()?;
        let elapsed = fade.start.elapsed().as_millis() as f32;
        Some((elapsed / CROSSFADE_MS).min(1.0))
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.fade_progress(), Some(p) if p < 1.0)
    }

    pub fn needs_ticks(&self) -> bool {
        self.is_transitioning() || self.zoom.is_animating()
    }

    pub fn tick(&mut self) {
        if let Some(progress) = self.fade_progress() {
            if progress >= 1.0 {
                self.fade = None;
            }
        }
        self.zoom.tick();
    }
}

/// Animated zoom factor: `level` eases toward `target` on each tick.
pub struct Zoom {
    pub level: f32,
    target: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            level: ZOOM_MIN,
            target: ZOOM_MIN,
        }
    }
}

impl Zoom {
    pub fn step_in(&mut self) {
        self.target = (self.target * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn step_out(&mut self) {
        self.target = (self.target / ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        if self.target < 1.02 {
            self.target = ZOOM_MIN;
        }
    }

    pub fn reset(&mut self) {
        self.level = ZOOM_MIN;
        self.target = ZOOM_MIN;
    }

    pub fn is_zoomed(&self) -> bool {
        self.level > ZOOM_MIN
    }

    pub fn is_animating(&self) -> bool {
        (self.level - self.target).abs() > 0.005
    }

    pub fn tick(&mut self) {
        if !self.is_animating() {
            self.level = self.target;
            return;
        }
        // Exponential easing: cover a quarter of the remaining distance
        // per frame at ~60fps.
        self.level += (self.target - self.level) * 0.25;
        if (self.level - self.target).abs() < 0.005 {
            self.level = self.target;
        }
    }
}
