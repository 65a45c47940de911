use crate::color::{Rgba, Theme};
use crate::surface::Surface;

const RING_RADIUS: f32 = 16.0;
const DOT_RADIUS: f32 = 4.0;
const PRESSED_SCALE: f32 = 0.9;
/// Longest integration step; stiffer springs need small steps
const MAX_SUBSTEP: f32 = 1.0 / 240.0;

/// Damped spring chasing a target in 2D
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl Spring {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            position: (0.0, 0.0),
            velocity: (0.0, 0.0),
            stiffness,
            damping,
            mass: mass.max(1e-3),
        }
    }

    pub fn snap_to(&mut self, target: (f32, f32)) {
        self.position = target;
        self.velocity = (0.0, 0.0);
    }

    /// Integrate `dt` seconds toward `target`
    pub fn step(&mut self, target: (f32, f32), dt: f32) {
        if dt.is_nan() || dt <= 0.0 {
            return;
        }
        let substeps = (dt / MAX_SUBSTEP).ceil().max(1.0) as usize;
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.velocity.0 = self.advance_axis(self.position.0 - target.0, self.velocity.0, h);
            self.velocity.1 = self.advance_axis(self.position.1 - target.1, self.velocity.1, h);
            self.position.0 += self.velocity.0 * h;
            self.position.1 += self.velocity.1 * h;
        }
    }

    /// Semi-implicit update; damping is solved implicitly so heavy damping
    /// on a light mass cannot blow up
    fn advance_axis(&self, offset: f32, velocity: f32, h: f32) -> f32 {
        let accel = -self.stiffness * offset / self.mass;
        (velocity + accel * h) / (1.0 + h * self.damping / self.mass)
    }
}

/// Visual state of the cursor ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorVariant {
    #[default]
    Default,
    Clicked,
}

impl CursorVariant {
    fn ring_style(&self) -> (f32, f32, f32, f32) {
        // (scale, fill alpha, stroke alpha, stroke width)
        match self {
            CursorVariant::Default => (1.0, 0.1, 0.5, 1.0),
            CursorVariant::Clicked => (PRESSED_SCALE, 0.3, 1.0, 2.0),
        }
    }
}

/// Ring plus dot that trail the pointer on springs
#[derive(Debug, Clone)]
pub struct Cursor {
    ring: Spring,
    dot: Spring,
    pub variant: CursorVariant,
    visible: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            ring: Spring::new(500.0, 28.0, 0.5),
            dot: Spring::new(1000.0, 30.0, 0.1),
            variant: CursorVariant::Default,
            visible: false,
        }
    }

    /// Follow the pointer. `target` is None until the pointer first appears.
    pub fn update(&mut self, target: Option<(f32, f32)>, pressed: bool, dt: f32) {
        let Some(target) = target else {
            return;
        };
        if !self.visible {
            self.ring.snap_to(target);
            self.dot.snap_to(target);
            self.visible = true;
        }
        self.ring.step(target, dt);
        self.dot.step(target, dt);
        self.variant = if pressed {
            CursorVariant::Clicked
        } else {
            CursorVariant::Default
        };
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn ring_position(&self) -> (f32, f32) {
        self.ring.position
    }

    pub fn dot_position(&self) -> (f32, f32) {
        self.dot.position
    }

    pub fn draw(&self, surface: &mut Surface, theme: Theme) {
        if !self.is_visible() {
            return;
        }
        let accent = Rgba::from_rgb8(100, 150, 255);
        let (scale, fill, stroke, width) = self.variant.ring_style();
        let (rx, ry) = self.ring_position();
        let radius = RING_RADIUS * scale;

        surface.fill_circle(rx, ry, radius, accent.with_alpha(fill));
        surface.stroke_circle(rx, ry, radius, width, accent.with_alpha(stroke));

        let (dx, dy) = self.dot_position();
        surface.fill_circle(dx, dy, DOT_RADIUS, theme.primary());
    }
}
