use crate::color::Theme;
use crate::flow_field::FlowField;
use crate::particle::{Particle, StepContext};
use crate::pointer::PointerSnapshot;
use crate::settings::FieldSettings;
use crate::surface::Surface;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Stroke width of connector curves in px
const CONNECTOR_WIDTH: f32 = 0.5;
/// Decorrelates the connector jitter stream from the spawn stream
const JITTER_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Number of particles for a viewport: one per `divisor` px of width, capped.
///
/// The cap keeps the O(n²) connector pass tractable every frame.
pub fn particle_budget(viewport_width: f32, divisor: f32, cap: usize) -> usize {
    if !viewport_width.is_finite() || viewport_width <= 0.0 || divisor <= 0.0 {
        return 0;
    }
    ((viewport_width / divisor).floor() as usize).min(cap)
}

/// Counters reported after each frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub tick: u64,
    pub particles: usize,
    pub connections: usize,
}

/// Ambient particle field: owns the particles, the flow field and the surface
/// they are drawn to, and produces one frame per call to [`ParticleField::frame`]
pub struct ParticleField {
    pub particles: Vec<Particle>,
    pub flow: FlowField,
    pub theme: Theme,
    pub settings: FieldSettings,
    surface: Option<Surface>,
    width: f32,
    height: f32,
    scale: f32,
    seed: u64,
    rng: StdRng,
    jitter_rng: StdRng,
    last_stats: FrameStats,
}

impl ParticleField {
    /// Build a field for a viewport of `width` x `height` px drawn at `scale`
    /// buffer pixels per px
    pub fn new(width: f32, height: f32, scale: f32, theme: Theme, settings: FieldSettings, seed: u64) -> Self {
        let mut field = Self {
            particles: Vec::new(),
            flow: FlowField::new(settings.cell_size),
            theme,
            settings,
            surface: None,
            width: clamp_extent(width),
            height: clamp_extent(height),
            scale,
            seed,
            rng: StdRng::seed_from_u64(seed),
            jitter_rng: StdRng::seed_from_u64(seed ^ JITTER_STREAM),
            last_stats: FrameStats::default(),
        };
        field.attach_surface();
        field.rebuild();
        field
    }

    /// (Re)allocate the surface; on failure the field renders nothing
    fn attach_surface(&mut self) {
        self.surface = match Surface::new(self.width, self.height, self.scale) {
            Ok(surface) => Some(surface),
            Err(err) => {
                log::warn!("particle field disabled: {}", err);
                None
            }
        };
    }

    /// Recreate the whole particle set and restart flow-field time
    pub fn rebuild(&mut self) {
        let count = particle_budget(self.width, self.settings.density_divisor, self.settings.max_particles);
        let (width, height, theme) = (self.width, self.height, self.theme);
        let mut particles = Vec::with_capacity(count);
        for _ in 0..count {
            particles.push(Particle::spawn(&mut self.rng, width, height, theme));
        }
        self.particles = particles;
        self.flow.set_cell_size(self.settings.cell_size);
        self.flow.reset();
        self.last_stats = FrameStats::default();
        log::debug!(
            "field rebuilt: {} particles, {}x{} px, theme {}, seed {}",
            count,
            width,
            height,
            theme.name(),
            self.seed
        );
    }

    /// Rebuild with a fresh random stream
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self.jitter_rng = StdRng::seed_from_u64(seed ^ JITTER_STREAM);
        self.rebuild();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.rebuild();
    }

    /// Replace all settings. Population changes take effect through a rebuild.
    pub fn apply_settings(&mut self, settings: FieldSettings) {
        let repopulate = settings.density_divisor != self.settings.density_divisor
            || settings.max_particles != self.settings.max_particles;
        self.settings = settings;
        self.flow.set_cell_size(self.settings.cell_size);
        if repopulate {
            self.rebuild();
        }
    }

    /// Follow a viewport resize. Particles are kept and folded into the new bounds.
    pub fn resize(&mut self, width: f32, height: f32, scale: f32) {
        let (width, height) = (clamp_extent(width), clamp_extent(height));
        if width == self.width && height == self.height && scale == self.scale {
            return;
        }
        self.width = width;
        self.height = height;
        self.scale = scale;
        self.attach_surface();
        for particle in &mut self.particles {
            particle.rewrap(width, height);
        }
        log::debug!("field resized to {}x{} px at scale {}", width, height, scale);
    }

    /// Produce one frame: clear, advance time, update and draw every particle,
    /// then connect neighbours. Without a surface nothing happens.
    pub fn frame(&mut self, pointer: PointerSnapshot) -> FrameStats {
        let Some(surface) = self.surface.as_mut() else {
            return FrameStats::default();
        };
        surface.clear();
        let tick = self.flow.advance();

        let ctx = StepContext {
            tick,
            flow: &self.flow,
            pointer,
            theme: self.theme,
            settings: &self.settings,
            width: self.width,
            height: self.height,
        };
        for particle in &mut self.particles {
            particle.update(&ctx);
            particle.draw(surface, self.settings.draw_trails);
        }

        let connections = if self.settings.draw_connectors {
            connect(&self.particles, surface, self.theme, &self.settings, &mut self.jitter_rng)
        } else {
            0
        };

        self.last_stats = FrameStats {
            tick,
            particles: self.particles.len(),
            connections,
        };
        self.last_stats
    }

    /// Draw the current state onto another surface without advancing time.
    /// Jitter comes from a copy of the live stream, so later frames are unaffected.
    pub fn draw_onto(&self, surface: &mut Surface) -> usize {
        for particle in &self.particles {
            particle.draw(surface, self.settings.draw_trails);
        }
        if self.settings.draw_connectors {
            let mut jitter = self.jitter_rng.clone();
            connect(&self.particles, surface, self.theme, &self.settings, &mut jitter)
        } else {
            0
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut Surface> {
        self.surface.as_mut()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn tick(&self) -> u64 {
        self.flow.tick()
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}

fn clamp_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(1.0)
    } else {
        1.0
    }
}

/// Connector pass: a jittered quadratic curve between every pair closer than
/// the connect radius, fading with distance. Returns the number drawn.
pub fn connect<R: Rng + ?Sized>(
    particles: &[Particle],
    surface: &mut Surface,
    theme: Theme,
    settings: &FieldSettings,
    rng: &mut R,
) -> usize {
    let radius = settings.connect_radius;
    let jitter = settings.curve_jitter;
    let dimming = theme.connector_dimming();
    let mut drawn = 0;

    for (i, a) in particles.iter().enumerate() {
        for b in &particles[i + 1..] {
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance >= radius {
                continue;
            }

            let opacity = (1.0 - distance / radius) * dimming;
            let ctrl = (
                (a.x + b.x) / 2.0 + (rng.gen::<f32>() - 0.5) * 2.0 * jitter,
                (a.y + b.y) / 2.0 + (rng.gen::<f32>() - 0.5) * 2.0 * jitter,
            );
            surface.stroke_quadratic(
                (a.x, a.y),
                ctrl,
                (b.x, b.y),
                CONNECTOR_WIDTH,
                a.color.with_alpha(opacity).to_rgba(),
                b.color.with_alpha(opacity).to_rgba(),
            );
            drawn += 1;
        }
    }

    drawn
}
