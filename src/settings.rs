use serde::{Deserialize, Serialize};

/// All tunable parameters of the particle field consolidated into one struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    // === Flow Parameters ===
    /// Edge length of a flow-field grid cell in px
    pub cell_size: f32,
    /// Share of the previous velocity kept each frame (0.5-0.99)
    pub velocity_retain: f32,

    // === Pointer Parameters ===
    /// Whether the pointer perturbs nearby particles
    pub pointer_interaction: bool,
    /// Radius of pointer influence in px (50-400)
    pub influence_radius: f32,
    /// Impulse scale applied along the pointer offset (0.0-0.5)
    pub repel_factor: f32,
    /// Per-frame correction of hue and size back to baseline (0.01-0.5)
    pub decay_rate: f32,
    /// Inactivity window before the pointer counts as idle, in ms
    pub idle_timeout_ms: u64,

    // === Connector Parameters ===
    /// Draw curves between nearby particles
    pub draw_connectors: bool,
    /// Maximum distance for a connection in px (20-250)
    pub connect_radius: f32,
    /// Max offset of the curve control point per axis in px (0-40)
    pub curve_jitter: f32,

    // === Population Parameters ===
    /// One particle per this many px of viewport width (5-50)
    pub density_divisor: f32,
    /// Hard cap on particle count, bounds the O(n²) connector pass (10-150)
    pub max_particles: usize,

    // === Visual Parameters ===
    /// Draw fading trails behind particles
    pub draw_trails: bool,
    /// Show the backdrop: gradient blobs over the nebula
    pub show_blobs: bool,
    /// Show the spring-following cursor
    pub show_cursor: bool,
    /// Viewport px covered by one Braille dot (1-8)
    pub px_per_dot: f32,
    /// Minimum pixel alpha for a Braille dot to be lit (0.001-0.5)
    pub dot_threshold: f32,
    /// Target frames per second (10-120)
    pub fps: u32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            // Flow
            cell_size: 20.0,
            velocity_retain: 0.9,

            // Pointer
            pointer_interaction: true,
            influence_radius: 200.0,
            repel_factor: 0.1,
            decay_rate: 0.05,
            idle_timeout_ms: 2000,

            // Connectors
            draw_connectors: true,
            connect_radius: 100.0,
            curve_jitter: 10.0,

            // Population - load-shedding cap for the pair pass
            density_divisor: 10.0,
            max_particles: 150,

            // Visual
            draw_trails: true,
            show_blobs: true,
            show_cursor: true,
            px_per_dot: 4.0,
            dot_threshold: 0.01,
            fps: 60,
        }
    }
}

impl FieldSettings {
    /// Adjust flow-field cell size within bounds
    pub fn adjust_cell_size(&mut self, delta: f32) {
        self.cell_size = (self.cell_size + delta).clamp(5.0, 80.0);
    }

    /// Adjust velocity smoothing within bounds
    pub fn adjust_velocity_retain(&mut self, delta: f32) {
        self.velocity_retain = (self.velocity_retain + delta).clamp(0.5, 0.99);
    }

    /// Adjust pointer influence radius within bounds
    pub fn adjust_influence_radius(&mut self, delta: f32) {
        self.influence_radius = (self.influence_radius + delta).clamp(50.0, 400.0);
    }

    /// Adjust pointer impulse scale within bounds
    pub fn adjust_repel_factor(&mut self, delta: f32) {
        self.repel_factor = (self.repel_factor + delta).clamp(0.0, 0.5);
    }

    /// Adjust decay rate within bounds
    pub fn adjust_decay_rate(&mut self, delta: f32) {
        self.decay_rate = (self.decay_rate + delta).clamp(0.01, 0.5);
    }

    /// Adjust connection radius within bounds
    pub fn adjust_connect_radius(&mut self, delta: f32) {
        self.connect_radius = (self.connect_radius + delta).clamp(20.0, 250.0);
    }

    /// Adjust connector jitter within bounds
    pub fn adjust_curve_jitter(&mut self, delta: f32) {
        self.curve_jitter = (self.curve_jitter + delta).clamp(0.0, 40.0);
    }

    /// Adjust particle density within bounds
    pub fn adjust_density_divisor(&mut self, delta: f32) {
        self.density_divisor = (self.density_divisor + delta).clamp(5.0, 50.0);
    }

    /// Adjust particle cap within bounds
    pub fn adjust_max_particles(&mut self, delta: i32) {
        self.max_particles = (self.max_particles as i32 + delta).clamp(10, 150) as usize;
    }

    /// Adjust Braille dot scale within bounds
    pub fn adjust_px_per_dot(&mut self, delta: f32) {
        self.px_per_dot = (self.px_per_dot + delta).clamp(1.0, 8.0);
    }

    /// Adjust frame rate within bounds
    pub fn adjust_fps(&mut self, delta: i32) {
        self.fps = (self.fps as i32 + delta).clamp(10, 120) as u32;
    }

    /// Clamp every field into its supported range (used after loading files)
    pub fn sanitize(&mut self) {
        self.adjust_cell_size(0.0);
        self.adjust_velocity_retain(0.0);
        self.adjust_influence_radius(0.0);
        self.adjust_repel_factor(0.0);
        self.adjust_decay_rate(0.0);
        self.adjust_connect_radius(0.0);
        self.adjust_curve_jitter(0.0);
        self.adjust_density_divisor(0.0);
        self.adjust_max_particles(0);
        self.adjust_px_per_dot(0.0);
        self.adjust_fps(0);
        self.dot_threshold = self.dot_threshold.clamp(0.001, 0.5);
        self.idle_timeout_ms = self.idle_timeout_ms.clamp(100, 10_000);
    }

    pub fn toggle_pointer_interaction(&mut self) {
        self.pointer_interaction = !self.pointer_interaction;
    }

    pub fn toggle_trails(&mut self) {
        self.draw_trails = !self.draw_trails;
    }

    pub fn toggle_connectors(&mut self) {
        self.draw_connectors = !self.draw_connectors;
    }

    pub fn toggle_blobs(&mut self) {
        self.show_blobs = !self.show_blobs;
    }

    pub fn toggle_cursor(&mut self) {
        self.show_cursor = !self.show_cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjusters_clamp() {
        let mut settings = FieldSettings::default();
        settings.adjust_max_particles(1000);
        assert_eq!(settings.max_particles, 150);
        settings.adjust_max_particles(-1000);
        assert_eq!(settings.max_particles, 10);

        settings.adjust_influence_radius(-10_000.0);
        assert_eq!(settings.influence_radius, 50.0);

        settings.adjust_fps(500);
        assert_eq!(settings.fps, 120);
    }

    #[test]
    fn test_sanitize_repairs_loaded_values() {
        let mut settings = FieldSettings {
            cell_size: 0.0,
            max_particles: 100_000,
            velocity_retain: 2.0,
            dot_threshold: 0.0,
            ..Default::default()
        };
        settings.sanitize();
        assert_eq!(settings.cell_size, 5.0);
        assert_eq!(settings.max_particles, 150);
        assert_eq!(settings.velocity_retain, 0.99);
        assert_eq!(settings.dot_threshold, 0.001);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let parsed: FieldSettings = serde_json::from_str(r#"{"connect_radius": 120.0}"#).unwrap();
        assert_eq!(parsed.connect_radius, 120.0);
        assert_eq!(parsed.influence_radius, 200.0);
        assert!(parsed.draw_trails);
    }
}
