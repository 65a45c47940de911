use crate::color::Rgba;
use serde::{Deserialize, Serialize};
use std::f32::consts::{SQRT_2, TAU};

/// Horizontal drift keyframes in px, mirrored every 20 s
const DRIFT_X: [f32; 6] = [0.0, 20.0, -20.0, -10.0, 10.0, 0.0];
const DRIFT_X_PERIOD: f32 = 20.0;
/// Vertical drift keyframes in px, mirrored every 30 s
const DRIFT_Y: [f32; 6] = [0.0, -30.0, 20.0, 30.0, -30.0, 0.0];
const DRIFT_Y_PERIOD: f32 = 30.0;
/// Gradient tilt keyframes in degrees, mirrored every 25 s
const TILT: [f32; 6] = [0.0, 5.0, -5.0, 3.0, -3.0, 0.0];
const TILT_PERIOD: f32 = 25.0;

const FADE_IN_SECS: f32 = 1.0;
const GROW_SECS: f32 = 1.5;
const START_SCALE: f32 = 0.5;

const NEBULA_FADE_SECS: f32 = 2.0;
/// Share of a conic turn blended from the last stop back to the first
const CONIC_SEAM: f32 = 0.08;

/// Where a blob sits at a given moment
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    cx: f32,
    cy: f32,
    radius: f32,
    fade: f32,
    /// Gradient tilt in radians, clockwise
    tilt: f32,
}

/// One blurred gradient blob behind the particle field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Color at the top-left of the blob
    pub from: Rgba,
    /// Color at the bottom-right of the blob
    pub to: Rgba,
    /// Centre as a fraction of the viewport (0..1 on each axis)
    pub anchor: (f32, f32),
    /// Radius in px
    pub radius: f32,
    /// Seconds before the blob starts to appear
    pub delay: f32,
}

impl BlobConfig {
    /// Position, size, opacity multiplier and tilt at time `t` seconds
    fn placement(&self, width: f32, height: f32, t: f32) -> Option<Placement> {
        let local = t - self.delay;
        if local <= 0.0 {
            return None;
        }
        let grow = START_SCALE + (1.0 - START_SCALE) * ease_in_out((local / GROW_SECS).min(1.0));
        Some(Placement {
            cx: self.anchor.0 * width + mirrored_keyframes(&DRIFT_X, DRIFT_X_PERIOD, local),
            cy: self.anchor.1 * height + mirrored_keyframes(&DRIFT_Y, DRIFT_Y_PERIOD, local),
            radius: self.radius * grow,
            fade: (local / FADE_IN_SECS).min(1.0),
            tilt: mirrored_keyframes(&TILT, TILT_PERIOD, local).to_radians(),
        })
    }

    /// Color contribution at `(x, y)`; transparent outside the blob
    pub fn sample(&self, x: f32, y: f32, width: f32, height: f32, t: f32) -> Rgba {
        let Some(place) = self.placement(width, height, t) else {
            return Rgba::TRANSPARENT;
        };
        if place.radius <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        let dx = x - place.cx;
        let dy = y - place.cy;
        let d2 = (dx * dx + dy * dy) / (place.radius * place.radius);
        if d2 >= 1.0 {
            return Rgba::TRANSPARENT;
        }
        // Soft rim in place of a real blur
        let falloff = (1.0 - d2) * (1.0 - d2);
        // Undo the tilt so the gradient turns with the blob
        let (sin, cos) = place.tilt.sin_cos();
        let (ux, uy) = (dx * cos + dy * sin, dy * cos - dx * sin);
        let diagonal = ((ux + uy) / (2.0 * place.radius) * 0.5 + 0.5).clamp(0.0, 1.0);
        let color = self.from.lerp(&self.to, diagonal);
        color.with_alpha(color.a * falloff * place.fade)
    }
}

/// Shape of a nebula gradient layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientShape {
    /// Sweeps around the centre, starting straight up and turning clockwise
    Conic,
    /// Runs from the centre out to the viewport corners
    Radial,
}

/// One full-viewport gradient of the nebula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NebulaLayer {
    pub shape: GradientShape,
    /// Start, middle and end colors
    pub stops: [Rgba; 3],
    /// Seconds per full turn; negative turns counter-clockwise, 0 holds still
    pub spin_period: f32,
    /// Scale keyframes, looped
    pub pulse: Vec<f32>,
    pub pulse_period: f32,
}

impl NebulaLayer {
    /// Color at offset `(dx, dy)` from the nebula centre, `t` seconds in
    fn sample(&self, dx: f32, dy: f32, half_width: f32, half_height: f32, t: f32) -> Rgba {
        let scale = if self.pulse.is_empty() {
            1.0
        } else {
            looped_keyframes(&self.pulse, self.pulse_period, t).max(0.01)
        };
        let (dx, dy) = (dx / scale, dy / scale);
        match self.shape {
            GradientShape::Conic => {
                let turns = if self.spin_period != 0.0 { t / self.spin_period } else { 0.0 };
                let heading = dx.atan2(-dy) / TAU;
                let position = (heading - turns).rem_euclid(1.0);
                let color = three_stop(&self.stops, position);
                if position > 1.0 - CONIC_SEAM {
                    color.lerp(&self.stops[0], (position - (1.0 - CONIC_SEAM)) / CONIC_SEAM)
                } else {
                    color
                }
            }
            GradientShape::Radial => {
                let nx = dx / half_width.max(1.0);
                let ny = dy / half_height.max(1.0);
                let position = ((nx * nx + ny * ny).sqrt() / SQRT_2).min(1.0);
                three_stop(&self.stops, position)
            }
        }
    }
}

/// Slowly turning gradient haze that fills the whole viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NebulaConfig {
    /// Centre as a fraction of the viewport
    pub anchor: (f32, f32),
    /// Opacity of the whole stack once faded in
    pub opacity: f32,
    /// Seconds before the fade-in starts
    pub delay: f32,
    /// Painted bottom to top
    pub layers: Vec<NebulaLayer>,
}

impl NebulaConfig {
    pub fn sample(&self, x: f32, y: f32, width: f32, height: f32, t: f32) -> Rgba {
        let local = t - self.delay;
        if local <= 0.0 || self.opacity <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        let fade = (local / NEBULA_FADE_SECS).min(1.0);
        let dx = x - self.anchor.0 * width;
        let dy = y - self.anchor.1 * height;
        let color = self.layers.iter().fold(Rgba::TRANSPARENT, |acc, layer| {
            layer.sample(dx, dy, width / 2.0, height / 2.0, local).over(&acc)
        });
        color.with_alpha(color.a * self.opacity.min(1.0) * fade)
    }
}

/// Nebula and gradient blobs composited under the particles
#[derive(Debug, Clone, Default)]
pub struct Backdrop {
    pub blobs: Vec<BlobConfig>,
    pub nebula: Option<NebulaConfig>,
}

impl Backdrop {
    pub fn new(blobs: Vec<BlobConfig>, nebula: Option<NebulaConfig>) -> Self {
        Self { blobs, nebula }
    }

    /// Combined color at `(x, y)` in viewport px, `t` seconds after the
    /// backdrop appeared. The nebula lies lowest; later blobs paint over
    /// earlier ones.
    pub fn sample(&self, x: f32, y: f32, width: f32, height: f32, t: f32) -> Rgba {
        let base = match &self.nebula {
            Some(nebula) => nebula.sample(x, y, width, height, t),
            None => Rgba::TRANSPARENT,
        };
        self.blobs.iter().fold(base, |acc, blob| {
            blob.sample(x, y, width, height, t).over(&acc)
        })
    }
}

/// The three page-level blobs: blue→violet, purple→indigo, emerald→cyan
pub fn default_blobs() -> Vec<BlobConfig> {
    vec![
        BlobConfig {
            from: Rgba::from_rgba8(96, 165, 250, 0.2),
            to: Rgba::from_rgba8(139, 92, 246, 0.2),
            anchor: (0.2, 0.25),
            radius: 300.0,
            delay: 0.0,
        },
        BlobConfig {
            from: Rgba::from_rgba8(192, 132, 252, 0.2),
            to: Rgba::from_rgba8(99, 102, 241, 0.2),
            anchor: (0.8, 0.7),
            radius: 250.0,
            delay: 0.3,
        },
        BlobConfig {
            from: Rgba::from_rgba8(52, 211, 153, 0.1),
            to: Rgba::from_rgba8(6, 182, 212, 0.2),
            anchor: (0.45, 0.4),
            radius: 200.0,
            delay: 0.6,
        },
    ]
}

/// The page nebula: two counter-turning conic washes over a radial glow
pub fn default_nebula() -> NebulaConfig {
    NebulaConfig {
        anchor: (0.5, 0.5),
        opacity: 0.3,
        delay: 0.5,
        layers: vec![
            NebulaLayer {
                shape: GradientShape::Conic,
                stops: [
                    Rgba::from_rgba8(29, 78, 216, 0.2),
                    Rgba::from_rgba8(168, 85, 247, 0.1),
                    Rgba::from_rgba8(219, 39, 119, 0.2),
                ],
                spin_period: 60.0,
                pulse: vec![1.0, 1.1, 1.0],
                pulse_period: 20.0,
            },
            NebulaLayer {
                shape: GradientShape::Conic,
                stops: [
                    Rgba::from_rgba8(99, 102, 241, 0.1),
                    Rgba::from_rgba8(34, 211, 238, 0.1),
                    Rgba::from_rgba8(109, 40, 217, 0.2),
                ],
                spin_period: -50.0,
                pulse: vec![1.0, 1.2, 1.0],
                pulse_period: 15.0,
            },
            NebulaLayer {
                shape: GradientShape::Radial,
                stops: [
                    Rgba::from_rgba8(30, 58, 138, 0.0),
                    Rgba::from_rgba8(30, 58, 138, 0.05),
                    Rgba::from_rgba8(99, 102, 241, 0.1),
                ],
                spin_period: 0.0,
                pulse: vec![1.0, 1.1, 0.9, 1.0],
                pulse_period: 25.0,
            },
        ],
    }
}

/// Even three-stop gradient at `position` in 0..1
fn three_stop(stops: &[Rgba; 3], position: f32) -> Rgba {
    let position = position.clamp(0.0, 1.0);
    if position < 0.5 {
        stops[0].lerp(&stops[1], position * 2.0)
    } else {
        stops[1].lerp(&stops[2], (position - 0.5) * 2.0)
    }
}

/// Value of a keyframe track that plays forward, then backward, forever
pub fn mirrored_keyframes(keys: &[f32], period: f32, t: f32) -> f32 {
    let phase = (t / period).max(0.0);
    let cycle = phase.floor();
    let mut progress = phase - cycle;
    if cycle as u64 % 2 == 1 {
        progress = 1.0 - progress;
    }
    track_value(keys, progress)
}

/// Value of a keyframe track that restarts from the first key every period
pub fn looped_keyframes(keys: &[f32], period: f32, t: f32) -> f32 {
    if period <= 0.0 {
        return keys.first().copied().unwrap_or(1.0);
    }
    track_value(keys, (t / period).max(0.0).fract())
}

/// Eased position along evenly spaced keys, `progress` in 0..1
fn track_value(keys: &[f32], progress: f32) -> f32 {
    match keys {
        [] => 0.0,
        [only] => *only,
        _ => {
            let position = ease_in_out(progress) * (keys.len() - 1) as f32;
            let index = (position.floor() as usize).min(keys.len() - 2);
            let local = position - index as f32;
            keys[index] + (keys[index + 1] - keys[index]) * local
        }
    }
}

/// Cubic ease-in-out on 0..1
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> BlobConfig {
        BlobConfig {
            from: Rgba::new(1.0, 0.0, 0.0, 0.5),
            to: Rgba::new(0.0, 0.0, 1.0, 0.5),
            anchor: (0.5, 0.5),
            radius: 100.0,
            delay: 1.0,
        }
    }

    #[test]
    fn test_keyframes_mirror() {
        assert_eq!(mirrored_keyframes(&DRIFT_X, 20.0, 0.0), 0.0);
        // End of the forward pass lands on the last key
        assert!((mirrored_keyframes(&DRIFT_X, 20.0, 19.999) - 0.0).abs() < 0.1);
        // Backward pass retraces the forward one
        let forward = mirrored_keyframes(&DRIFT_Y, 30.0, 7.0);
        let backward = mirrored_keyframes(&DRIFT_Y, 30.0, 53.0);
        assert!((forward - backward).abs() < 1e-3);

        assert_eq!(mirrored_keyframes(&[], 1.0, 3.0), 0.0);
        assert_eq!(mirrored_keyframes(&[4.0], 1.0, 3.0), 4.0);
    }

    #[test]
    fn test_ease_in_out_endpoints() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blob_waits_for_delay() {
        let b = blob();
        assert_eq!(b.sample(400.0, 300.0, 800.0, 600.0, 0.5), Rgba::TRANSPARENT);
        assert!(b.sample(400.0, 300.0, 800.0, 600.0, 1.5).a > 0.0);
    }

    #[test]
    fn test_blob_fades_in_and_falls_off() {
        let b = blob();
        let early = b.sample(400.0, 300.0, 800.0, 600.0, 1.25).a;
        let settled = b.sample(400.0, 300.0, 800.0, 600.0, 4.0).a;
        assert!(early < settled);
        assert!(settled <= 0.5 + 1e-6);

        // Outside the radius nothing is drawn
        assert_eq!(b.sample(0.0, 0.0, 800.0, 600.0, 4.0), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_blob_gradient_runs_diagonally() {
        let b = blob();
        let t = 5.0;
        let Placement { cx, cy, .. } = b.placement(800.0, 600.0, t).unwrap();
        let top_left = b.sample(cx - 40.0, cy - 40.0, 800.0, 600.0, t);
        let bottom_right = b.sample(cx + 40.0, cy + 40.0, 800.0, 600.0, t);
        assert!(top_left.r > top_left.b);
        assert!(bottom_right.b > bottom_right.r);
    }

    #[test]
    fn test_blob_gradient_tilts_with_track() {
        let b = blob();
        let point = |place: &Placement| (place.cx + 40.0, place.cy - 40.0);

        // Off-diagonal points sit at the gradient midpoint while untilted
        let level = b.placement(800.0, 600.0, 51.0).unwrap();
        assert!(level.tilt.abs() < 1e-4);
        let (x, y) = point(&level);
        let c = b.sample(x, y, 800.0, 600.0, 51.0);
        assert!((c.r - c.b).abs() < 1e-3);

        let tilted = b.placement(800.0, 600.0, 10.2).unwrap();
        let expected = mirrored_keyframes(&TILT, TILT_PERIOD, 9.2).to_radians();
        assert!((tilted.tilt - expected).abs() < 1e-4);
        assert!(tilted.tilt > 0.05);
        let (x, y) = point(&tilted);
        let c = b.sample(x, y, 800.0, 600.0, 10.2);
        assert!((c.r - c.b).abs() > 1e-2);
    }

    #[test]
    fn test_looped_keyframes_restart() {
        let pulse = [1.0, 1.1, 1.0];
        assert_eq!(looped_keyframes(&pulse, 20.0, 0.0), 1.0);
        assert!((looped_keyframes(&pulse, 20.0, 10.0) - 1.1).abs() < 1e-5);
        assert!((looped_keyframes(&pulse, 20.0, 30.0) - 1.1).abs() < 1e-4);
        assert_eq!(looped_keyframes(&pulse, 0.0, 3.0), 1.0);
    }

    fn conic(spin_period: f32) -> NebulaLayer {
        NebulaLayer {
            shape: GradientShape::Conic,
            stops: [
                Rgba::new(1.0, 0.0, 0.0, 1.0),
                Rgba::new(0.0, 1.0, 0.0, 1.0),
                Rgba::new(0.0, 0.0, 1.0, 1.0),
            ],
            spin_period,
            pulse: vec![1.0],
            pulse_period: 10.0,
        }
    }

    fn close(a: Rgba, b: Rgba) -> bool {
        (a.r - b.r).abs() < 1e-3 && (a.g - b.g).abs() < 1e-3 && (a.b - b.b).abs() < 1e-3
    }

    #[test]
    fn test_conic_layer_turns() {
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
        let layer = conic(60.0);
        // First stop points straight up, the middle one straight down
        assert!(close(layer.sample(0.0, -50.0, 400.0, 300.0, 0.0), red));
        assert!(close(layer.sample(0.0, 50.0, 400.0, 300.0, 0.0), Rgba::new(0.0, 1.0, 0.0, 1.0)));
        // A quarter of the period later it has turned a quarter clockwise
        assert!(close(layer.sample(50.0, 0.0, 400.0, 300.0, 15.0), red));

        let reverse = conic(-60.0);
        assert!(close(reverse.sample(-50.0, 0.0, 400.0, 300.0, 15.0), red));

        let still = conic(0.0);
        assert!(close(still.sample(0.0, -50.0, 400.0, 300.0, 33.0), red));
    }

    #[test]
    fn test_radial_layer_runs_to_corners() {
        let layer = NebulaLayer {
            shape: GradientShape::Radial,
            ..conic(0.0)
        };
        assert!(close(layer.sample(0.0, 0.0, 400.0, 300.0, 0.0), Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert!(close(layer.sample(400.0, 300.0, 400.0, 300.0, 0.0), Rgba::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_nebula_waits_then_fades_in() {
        let nebula = default_nebula();
        let (x, y) = (100.0, 80.0);
        assert_eq!(nebula.sample(x, y, 800.0, 600.0, 0.4), Rgba::TRANSPARENT);
        let early = nebula.sample(x, y, 800.0, 600.0, 1.0).a;
        let settled = nebula.sample(x, y, 800.0, 600.0, 5.0).a;
        assert!(early > 0.0 && early < settled);
        assert!(settled <= nebula.opacity);

        let hidden = NebulaConfig {
            opacity: 0.0,
            ..default_nebula()
        };
        assert_eq!(hidden.sample(x, y, 800.0, 600.0, 5.0), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_backdrop_stacks_blobs() {
        let backdrop = Backdrop::new(default_blobs(), None);
        let single = Backdrop::new(default_blobs()[..1].to_vec(), None);
        let (x, y) = (0.2 * 800.0, 0.25 * 600.0);
        assert!(backdrop.sample(x, y, 800.0, 600.0, 10.0).a >= single.sample(x, y, 800.0, 600.0, 10.0).a);
        assert_eq!(Backdrop::default().sample(x, y, 800.0, 600.0, 10.0), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_nebula_lies_under_blobs() {
        // Far from every blob only the nebula shows
        let (x, y) = (790.0, 10.0);
        let backdrop = Backdrop::new(default_blobs(), Some(default_nebula()));
        let nebula_only = default_nebula().sample(x, y, 800.0, 600.0, 10.0);
        assert!(nebula_only.a > 0.0);
        let combined = backdrop.sample(x, y, 800.0, 600.0, 10.0);
        assert!(close(combined, nebula_only));
        assert!((combined.a - nebula_only.a).abs() < 1e-6);
    }
}
