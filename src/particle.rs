use crate::color::{Hsla, Theme};
use crate::flow_field::FlowField;
use crate::pointer::PointerSnapshot;
use crate::settings::FieldSettings;
use crate::surface::Surface;
use rand::Rng;
use std::collections::VecDeque;

/// Amplitude of the per-particle heading wobble in radians
const PHASE_AMPLITUDE: f32 = 0.5;
/// Rate at which the wobble phase advances per tick
const PHASE_RATE: f32 = 0.001;
/// Hue shift in degrees at full pointer influence
const HUE_SHIFT: f32 = 30.0;
/// Peak opacity of the oldest-to-newest trail
const TRAIL_ALPHA: f32 = 0.2;

/// One recorded trail sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Everything a particle needs for one simulation step, passed explicitly
pub struct StepContext<'a> {
    pub tick: u64,
    pub flow: &'a FlowField,
    pub pointer: PointerSnapshot,
    pub theme: Theme,
    pub settings: &'a FieldSettings,
    pub width: f32,
    pub height: f32,
}

/// A single point in the ambient field
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub base_size: f32,
    pub size: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    /// Current heading in radians
    pub angle: f32,
    /// Cruise speed along the heading
    pub velocity: f32,
    pub max_velocity: f32,
    pub original_hue: f32,
    pub hue: f32,
    /// Phase offset so particles do not steer in lockstep
    pub unique_offset: f32,
    pub color: Hsla,
    /// Most recent sample first
    pub history: VecDeque<TrailPoint>,
    pub max_history: usize,
}

impl Particle {
    /// Place a new particle uniformly inside the bounds with randomized traits
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, width: f32, height: f32, theme: Theme) -> Self {
        let (hue_low, hue_high) = theme.hue_band();
        let original_hue = rng.gen_range(hue_low..hue_high);
        let base_size = rng.gen_range(1.0..4.0);
        let velocity = rng.gen_range(0.3..0.8);
        let max_history = rng.gen_range(5..15);

        Self {
            x: wrap(rng.gen::<f32>() * width, width),
            y: wrap(rng.gen::<f32>() * height, height),
            base_size,
            size: base_size,
            speed_x: 0.0,
            speed_y: 0.0,
            angle: 0.0,
            velocity,
            max_velocity: velocity * 3.0,
            original_hue,
            hue: original_hue,
            unique_offset: rng.gen::<f32>() * 1000.0,
            color: Hsla::new(original_hue, theme.resting_tone()),
            history: VecDeque::with_capacity(max_history + 1),
            max_history,
        }
    }

    /// Advance one frame: steer by the flow field, react to the pointer,
    /// smooth the velocity, move with toroidal wrap and record the trail
    pub fn update(&mut self, ctx: &StepContext) {
        let t = ctx.tick as f32;
        self.angle = ctx.flow.angle_at(self.x, self.y)
            + (self.unique_offset + t * PHASE_RATE).sin() * PHASE_AMPLITUDE;

        match self.influence(&ctx.pointer, ctx.settings) {
            Some(influence) => self.excite(influence, ctx),
            None => self.relax(ctx.theme, ctx.settings.decay_rate),
        }

        let retain = ctx.settings.velocity_retain;
        let target_x = self.angle.cos() * self.velocity;
        let target_y = self.angle.sin() * self.velocity;
        self.speed_x = self.speed_x * retain + target_x * (1.0 - retain);
        self.speed_y = self.speed_y * retain + target_y * (1.0 - retain);

        self.x = wrap(self.x + self.speed_x, ctx.width);
        self.y = wrap(self.y + self.speed_y, ctx.height);

        self.record_history();
    }

    /// Pointer influence in (0, 1] when the pointer is active and within range
    pub fn influence(&self, pointer: &PointerSnapshot, settings: &FieldSettings) -> Option<f32> {
        if !settings.pointer_interaction || !pointer.active {
            return None;
        }
        let dx = self.x - pointer.x;
        let dy = self.y - pointer.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < settings.influence_radius {
            Some(1.0 - distance / settings.influence_radius)
        } else {
            None
        }
    }

    fn excite(&mut self, influence: f32, ctx: &StepContext) {
        let repel = ctx.settings.repel_factor * influence;
        self.speed_x += (self.x - ctx.pointer.x) * repel;
        self.speed_y += (self.y - ctx.pointer.y) * repel;

        self.hue = self.original_hue + HUE_SHIFT * influence;
        self.color = Hsla::new(self.hue, ctx.theme.excited_tone(influence));
        self.size = self.base_size * (1.0 + influence);
    }

    /// Ease hue and size back toward their baselines
    fn relax(&mut self, theme: Theme, rate: f32) {
        self.hue += (self.original_hue - self.hue) * rate;
        self.size += (self.base_size - self.size) * rate;
        self.color = Hsla::new(self.hue, theme.resting_tone());
    }

    fn record_history(&mut self) {
        self.history.push_front(TrailPoint {
            x: self.x,
            y: self.y,
            size: self.size,
        });
        while self.history.len() > self.max_history {
            self.history.pop_back();
        }
    }

    /// Draw the trail (oldest first, fading in) and then the particle disc
    pub fn draw(&self, surface: &mut Surface, draw_trails: bool) {
        if draw_trails && !self.history.is_empty() {
            let len = self.history.len() as f32;
            for (i, point) in self.history.iter().enumerate().rev() {
                let fade = 1.0 - i as f32 / len;
                let color = self.color.with_alpha(fade * TRAIL_ALPHA).to_rgba();
                surface.fill_circle(point.x, point.y, point.size * fade, color);
            }
        }
        surface.fill_circle(self.x, self.y, self.size, self.color.to_rgba());
    }

    /// Fold the position back inside new bounds
    pub fn rewrap(&mut self, width: f32, height: f32) {
        self.x = wrap(self.x, width);
        self.y = wrap(self.y, height);
    }
}

/// Toroidal wrap into `[0, extent)`
pub fn wrap(value: f32, extent: f32) -> f32 {
    if !value.is_finite() || extent <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn step<'a>(flow: &'a FlowField, settings: &'a FieldSettings, pointer: PointerSnapshot, tick: u64) -> StepContext<'a> {
        StepContext {
            tick,
            flow,
            pointer,
            theme: Theme::Dark,
            settings,
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_spawn_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for theme in [Theme::Dark, Theme::Light] {
            let (low, high) = theme.hue_band();
            for _ in 0..500 {
                let p = Particle::spawn(&mut rng, 800.0, 600.0, theme);
                assert!((0.0..800.0).contains(&p.x));
                assert!((0.0..600.0).contains(&p.y));
                assert!((1.0..4.0).contains(&p.base_size));
                assert!((low..high).contains(&p.original_hue));
                assert!((0.3..0.8).contains(&p.velocity));
                assert_eq!(p.max_velocity, p.velocity * 3.0);
                assert!((5..15).contains(&p.max_history));
                assert!((0.0..1000.0).contains(&p.unique_offset));
                assert_eq!(p.color.a, theme.resting_tone().alpha);
            }
        }
    }

    #[test]
    fn test_same_seed_same_particle() {
        let a = Particle::spawn(&mut StdRng::seed_from_u64(42), 800.0, 600.0, Theme::Dark);
        let b = Particle::spawn(&mut StdRng::seed_from_u64(42), 800.0, 600.0, Theme::Dark);
        assert_eq!((a.x, a.y, a.hue, a.velocity), (b.x, b.y, b.hue, b.velocity));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(-1.0, 800.0), 799.0);
        assert_eq!(wrap(800.0, 800.0), 0.0);
        assert_eq!(wrap(801.5, 800.0), 1.5);
        assert_eq!(wrap(-1e-9, 800.0), 0.0);
        assert_eq!(wrap(f32::NAN, 800.0), 0.0);
        assert!(wrap(-1e-6, 800.0) < 800.0);
    }

    #[test]
    fn test_updates_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut particles: Vec<Particle> = (0..50)
            .map(|_| Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark))
            .collect();

        for tick in 1..=2000 {
            // Sweep an active pointer around to kick particles across edges
            let pointer = PointerSnapshot::active_at((tick % 800) as f32, (tick % 600) as f32);
            let ctx = step(&flow, &settings, pointer, tick);
            for p in &mut particles {
                p.update(&ctx);
                assert!(p.x >= 0.0 && p.x < 800.0, "x out of bounds: {}", p.x);
                assert!(p.y >= 0.0 && p.y < 600.0, "y out of bounds: {}", p.y);
                assert!(p.size.is_finite() && p.size <= p.base_size * 2.0 + 1e-4);
                assert!(p.hue.is_finite());
            }
        }
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut rng = StdRng::seed_from_u64(11);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        let mut positions = Vec::new();

        for tick in 1..=40 {
            p.update(&step(&flow, &settings, PointerSnapshot::idle(), tick));
            positions.push((p.x, p.y));
            assert!(p.history.len() <= p.max_history);
        }

        assert_eq!(p.history.len(), p.max_history);
        // Front is the newest sample, back the oldest retained one
        let newest = positions[positions.len() - 1];
        let oldest = positions[positions.len() - p.max_history];
        assert_eq!((p.history[0].x, p.history[0].y), newest);
        let back = p.history.back().unwrap();
        assert_eq!((back.x, back.y), oldest);
    }

    #[test]
    fn test_pointer_at_particle_doubles_size() {
        let mut rng = StdRng::seed_from_u64(5);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        let pointer = PointerSnapshot::active_at(p.x, p.y);

        assert_eq!(p.influence(&pointer, &settings), Some(1.0));
        p.update(&step(&flow, &settings, pointer, 1));
        assert!((p.size - p.base_size * 2.0).abs() < 1e-6);
        assert!((p.hue - (p.original_hue + 30.0)).abs() < 1e-4);
        assert!((p.color.a - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_influence_respects_radius_and_toggle() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        p.x = 300.0;
        p.y = 300.0;

        let near = PointerSnapshot::active_at(400.0, 300.0);
        let far = PointerSnapshot::active_at(500.0, 300.0);
        assert_eq!(p.influence(&near, &settings), Some(0.5));
        assert_eq!(p.influence(&far, &settings), None);

        let idle = PointerSnapshot { active: false, ..near };
        assert_eq!(p.influence(&idle, &settings), None);

        settings.toggle_pointer_interaction();
        assert_eq!(p.influence(&near, &settings), None);
    }

    #[test]
    fn test_pointer_pushes_particle_away() {
        let mut rng = StdRng::seed_from_u64(9);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        p.x = 300.0;
        p.y = 300.0;
        p.velocity = 0.0;

        p.update(&step(&flow, &settings, PointerSnapshot::active_at(250.0, 300.0), 1));
        assert!(p.speed_x > 0.0);
        assert!(p.x > 300.0);
    }

    #[test]
    fn test_pointer_impulse_is_not_capped() {
        let mut rng = StdRng::seed_from_u64(10);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        p.x = 300.0;
        p.y = 300.0;

        // Influence 0.5, impulse (300 - 200) * 0.1 * 0.5 = 5 px per frame
        p.update(&step(&flow, &settings, PointerSnapshot::active_at(200.0, 300.0), 1));
        let expected_x = 5.0 * 0.9 + p.angle.cos() * p.velocity * 0.1;
        let expected_y = p.angle.sin() * p.velocity * 0.1;
        assert!((p.speed_x - expected_x).abs() < 1e-4, "speed_x {} != {}", p.speed_x, expected_x);
        assert!((p.speed_y - expected_y).abs() < 1e-4);
        assert!(p.speed_x > p.max_velocity);
        assert!((p.x - (300.0 + expected_x)).abs() < 1e-3);
    }

    #[test]
    fn test_decay_converges_monotonically() {
        let mut rng = StdRng::seed_from_u64(13);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);

        let pointer = PointerSnapshot::active_at(p.x, p.y);
        p.update(&step(&flow, &settings, pointer, 1));
        assert!(p.size > p.base_size);

        let mut last_hue_gap = (p.hue - p.original_hue).abs();
        let mut last_size_gap = (p.size - p.base_size).abs();
        for tick in 2..=300 {
            p.update(&step(&flow, &settings, PointerSnapshot::idle(), tick));
            let hue_gap = (p.hue - p.original_hue).abs();
            let size_gap = (p.size - p.base_size).abs();
            assert!(hue_gap <= last_hue_gap);
            assert!(size_gap <= last_size_gap);
            last_hue_gap = hue_gap;
            last_size_gap = size_gap;
        }
        assert!(last_hue_gap < 1e-3);
        assert!(last_size_gap < 1e-3);
        assert_eq!(p.color.a, 0.3);
    }

    #[test]
    fn test_draw_marks_surface() {
        let mut rng = StdRng::seed_from_u64(21);
        let flow = FlowField::default();
        let settings = FieldSettings::default();
        let mut surface = Surface::new(800.0, 600.0, 1.0).unwrap();
        let mut p = Particle::spawn(&mut rng, 800.0, 600.0, Theme::Dark);
        for tick in 1..=5 {
            p.update(&step(&flow, &settings, PointerSnapshot::idle(), tick));
        }

        p.draw(&mut surface, true);
        let px = surface.pixel(p.x as u32, p.y as u32);
        assert!(px.a > 0.0);
    }
}
