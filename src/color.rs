use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Page theme. Picks the hue band, tones and connector dimming of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Saturation/lightness (percent) and alpha applied on top of a hue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub saturation: f32,
    pub lightness: f32,
    pub alpha: f32,
}

impl Theme {
    pub fn name(&self) -> &str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }

    pub fn toggle(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Half-open hue range particles draw their base hue from
    pub fn hue_band(&self) -> (f32, f32) {
        match self {
            Theme::Dark => (220.0, 280.0), // blues and purples
            Theme::Light => (190.0, 250.0), // blues with some cyan
        }
    }

    /// Tone of an unperturbed particle
    pub fn resting_tone(&self) -> Tone {
        match self {
            Theme::Dark => Tone {
                saturation: 70.0,
                lightness: 70.0,
                alpha: 0.3,
            },
            Theme::Light => Tone {
                saturation: 60.0,
                lightness: 60.0,
                alpha: 0.2,
            },
        }
    }

    /// Tone of a particle inside the pointer's influence radius
    pub fn excited_tone(&self, influence: f32) -> Tone {
        match self {
            Theme::Dark => Tone {
                saturation: 80.0,
                lightness: 70.0,
                alpha: 0.4 + influence * 0.2,
            },
            Theme::Light => Tone {
                saturation: 70.0,
                lightness: 60.0,
                alpha: 0.3 + influence * 0.2,
            },
        }
    }

    /// Extra opacity factor for connector curves
    pub fn connector_dimming(&self) -> f32 {
        match self {
            Theme::Dark => 0.1,
            Theme::Light => 0.05,
        }
    }

    pub fn background(&self) -> Rgba {
        match self {
            Theme::Dark => Rgba::from_rgb8(10, 10, 22),
            Theme::Light => Rgba::from_rgb8(248, 250, 252),
        }
    }

    /// Accent used for the cursor dot
    pub fn primary(&self) -> Rgba {
        match self {
            Theme::Dark => Rgba::from_rgb8(129, 140, 248),
            Theme::Light => Rgba::from_rgb8(79, 70, 229),
        }
    }
}

/// Hue in degrees, saturation and lightness in percent, alpha in 0..1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: f32,
}

impl Hsla {
    pub fn new(h: f32, tone: Tone) -> Self {
        Self {
            h,
            s: tone.saturation,
            l: tone.lightness,
            a: tone.alpha,
        }
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self { a: alpha, ..*self }
    }

    pub fn to_rgba(&self) -> Rgba {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0) / 360.0;

        if s == 0.0 {
            return Rgba::new(l, l, l, self.a);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Rgba::new(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
            self.a.clamp(0.0, 1.0),
        )
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Straight (non-premultiplied) color with channels in 0..1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self::from_rgb8(r, g, b).with_alpha(alpha)
    }

    pub fn with_alpha(&self, a: f32) -> Self {
        Self { a, ..*self }
    }

    pub fn lerp(&self, other: &Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        Rgba::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Source-over compositing of `self` on top of `dst`
    pub fn over(&self, dst: &Rgba) -> Rgba {
        let sa = self.a.clamp(0.0, 1.0);
        let da = dst.a.clamp(0.0, 1.0);
        let out_a = sa + da * (1.0 - sa);
        if out_a <= f32::EPSILON {
            return Rgba::TRANSPARENT;
        }
        let mix = |s: f32, d: f32| (s * sa + d * da * (1.0 - sa)) / out_a;
        Rgba::new(
            mix(self.r, dst.r),
            mix(self.g, dst.g),
            mix(self.b, dst.b),
            out_a,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Flatten onto an opaque background and convert to a terminal color
    pub fn to_terminal(&self, background: &Rgba) -> Color {
        let [r, g, b, _] = self.over(background).to_rgba8();
        Color::Rgb(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_hsla_primaries() {
        let red = Hsla { h: 0.0, s: 100.0, l: 50.0, a: 1.0 }.to_rgba();
        assert!(close(red.r, 1.0) && close(red.g, 0.0) && close(red.b, 0.0));

        let blue = Hsla { h: 240.0, s: 100.0, l: 50.0, a: 0.5 }.to_rgba();
        assert!(close(blue.b, 1.0) && close(blue.r, 0.0));
        assert!(close(blue.a, 0.5));

        let grey = Hsla { h: 123.0, s: 0.0, l: 40.0, a: 1.0 }.to_rgba();
        assert!(close(grey.r, 0.4) && close(grey.g, 0.4) && close(grey.b, 0.4));
    }

    #[test]
    fn test_theme_tones() {
        assert_eq!(Theme::Dark.resting_tone().alpha, 0.3);
        assert_eq!(Theme::Light.resting_tone().alpha, 0.2);
        assert!(close(Theme::Dark.excited_tone(1.0).alpha, 0.6));
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
    }

    #[test]
    fn test_over_compositing() {
        let bg = Rgba::from_rgb8(0, 0, 0);
        let half_white = Rgba::new(1.0, 1.0, 1.0, 0.5);
        let out = half_white.over(&bg);
        assert!(close(out.a, 1.0));
        assert!(close(out.r, 0.5));

        // Transparent over transparent stays transparent
        assert_eq!(Rgba::TRANSPARENT.over(&Rgba::TRANSPARENT), Rgba::TRANSPARENT);
    }
}
