use crate::color::Rgba;
use crate::error::{FieldError, Result};
use image::{ImageBuffer, RgbaImage};
use std::f32::consts::{PI, TAU};

/// Largest pixel extent a surface may allocate per side
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// Pixel buffer with straight-alpha f32 channels
type PixelBuffer = ImageBuffer<image::Rgba<f32>, Vec<f32>>;

/// Offscreen 2D drawing surface.
///
/// Callers draw in viewport px; `scale` maps viewport px onto buffer pixels,
/// so a terminal surface can use one pixel per Braille dot while exports
/// render the same scene at full resolution.
pub struct Surface {
    buffer: PixelBuffer,
    width: f32,
    height: f32,
    scale: f32,
}

impl Surface {
    /// Create a surface covering `width` x `height` viewport px.
    /// Dimensions below 1 px are clamped up.
    pub fn new(width: f32, height: f32, scale: f32) -> Result<Self> {
        let width = sanitize_extent(width);
        let height = sanitize_extent(height);
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };

        let pixel_width = (width * scale).ceil().max(1.0);
        let pixel_height = (height * scale).ceil().max(1.0);
        if pixel_width > MAX_SURFACE_DIM as f32 || pixel_height > MAX_SURFACE_DIM as f32 {
            return Err(FieldError::SurfaceUnavailable {
                width: pixel_width.min(u32::MAX as f32) as u32,
                height: pixel_height.min(u32::MAX as f32) as u32,
                max: MAX_SURFACE_DIM,
            });
        }

        Ok(Self {
            buffer: ImageBuffer::new(pixel_width as u32, pixel_height as u32),
            width,
            height,
            scale,
        })
    }

    /// Viewport width in px
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Viewport height in px
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pixel_width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = image::Rgba([0.0; 4]);
        }
    }

    /// Color at a buffer pixel (transparent when out of range)
    pub fn pixel(&self, px: u32, py: u32) -> Rgba {
        if px >= self.buffer.width() || py >= self.buffer.height() {
            return Rgba::TRANSPARENT;
        }
        let [r, g, b, a] = self.buffer.get_pixel(px, py).0;
        Rgba::new(r, g, b, a)
    }

    /// Fill an antialiased disc centred at `(x, y)` with radius in viewport px
    pub fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        if radius <= 0.0 || color.a <= 0.0 {
            return;
        }
        self.fill_disc_px(x * self.scale, y * self.scale, radius * self.scale, color);
    }

    /// Stroke a circle outline
    pub fn stroke_circle(&mut self, x: f32, y: f32, radius: f32, line_width: f32, color: Rgba) {
        if radius <= 0.0 || color.a <= 0.0 {
            return;
        }
        let (cx, cy, r) = (x * self.scale, y * self.scale, radius * self.scale);
        let steps = ((TAU * r).ceil() as usize).max(8);
        let mut last = None;
        for i in 0..steps {
            let theta = i as f32 / steps as f32 * TAU;
            let point = (cx + r * theta.cos(), cy + r * theta.sin());
            last = self.plot_stroke_point(point, line_width * self.scale, color, last);
        }
    }

    /// Stroke a quadratic Bézier from `from` to `to` through control `ctrl`,
    /// colored by a linear gradient from `start` to `end`
    pub fn stroke_quadratic(
        &mut self,
        from: (f32, f32),
        ctrl: (f32, f32),
        to: (f32, f32),
        line_width: f32,
        start: Rgba,
        end: Rgba,
    ) {
        if start.a <= 0.0 && end.a <= 0.0 {
            return;
        }
        let s = self.scale;
        let (p0, p1, p2) = ((from.0 * s, from.1 * s), (ctrl.0 * s, ctrl.1 * s), (to.0 * s, to.1 * s));
        let length = distance(p0, p1) + distance(p1, p2);
        let steps = (length.ceil() as usize).max(1);

        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let u = 1.0 - t;
            let point = (
                u * u * p0.0 + 2.0 * u * t * p1.0 + t * t * p2.0,
                u * u * p0.1 + 2.0 * u * t * p1.1 + t * t * p2.1,
            );
            last = self.plot_stroke_point(point, line_width * s, start.lerp(&end, t), last);
        }
    }

    /// Flatten onto an opaque background. `background` gets buffer pixel coordinates.
    pub fn composite<F>(&self, background: F) -> RgbaImage
    where
        F: Fn(u32, u32) -> Rgba,
    {
        RgbaImage::from_fn(self.buffer.width(), self.buffer.height(), |px, py| {
            let bg = background(px, py).with_alpha(1.0);
            image::Rgba(self.pixel(px, py).over(&bg).to_rgba8())
        })
    }

    fn plot_stroke_point(
        &mut self,
        point: (f32, f32),
        width_px: f32,
        color: Rgba,
        last: Option<(i64, i64)>,
    ) -> Option<(i64, i64)> {
        if width_px >= 1.0 {
            self.fill_disc_px(point.0, point.1, width_px / 2.0, color);
            return None;
        }
        // Hairline: one pixel per sample, skipping repeats so overlapping
        // samples do not stack alpha
        let cell = (point.0.floor() as i64, point.1.floor() as i64);
        if last != Some(cell) {
            self.blend(cell.0, cell.1, color, width_px.max(0.0));
        }
        Some(cell)
    }

    fn fill_disc_px(&mut self, cx: f32, cy: f32, r: f32, color: Rgba) {
        if r < 0.5 {
            // Sub-pixel disc: deposit its area into the pixel under the centre
            let coverage = (PI * r * r).min(1.0);
            self.blend(cx.floor() as i64, cy.floor() as i64, color, coverage);
            return;
        }

        let min_x = (cx - r - 1.0).floor() as i64;
        let max_x = (cx + r + 1.0).ceil() as i64;
        let min_y = (cy - r - 1.0).floor() as i64;
        let max_y = (cy + r + 1.0).ceil() as i64;

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let d = distance((px as f32 + 0.5, py as f32 + 0.5), (cx, cy));
                let coverage = (r + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, color, coverage);
                }
            }
        }
    }

    fn blend(&mut self, px: i64, py: i64, color: Rgba, coverage: f32) {
        if px < 0 || py < 0 || px >= self.buffer.width() as i64 || py >= self.buffer.height() as i64 {
            return;
        }
        let dst = self.pixel(px as u32, py as u32);
        let src = color.with_alpha(color.a * coverage);
        let out = src.over(&dst);
        self.buffer
            .put_pixel(px as u32, py as u32, image::Rgba([out.r, out.g, out.b, out.a]));
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(1.0)
    } else {
        1.0
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_red() -> Rgba {
        Rgba::new(1.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_zero_area_is_clamped() {
        let surface = Surface::new(0.0, 0.0, 1.0).unwrap();
        assert_eq!(surface.width(), 1.0);
        assert_eq!(surface.height(), 1.0);
        assert_eq!(surface.pixel_width(), 1);
        assert_eq!(surface.pixel_height(), 1);

        let surface = Surface::new(f32::NAN, -5.0, 0.0).unwrap();
        assert_eq!(surface.width(), 1.0);
        assert_eq!(surface.scale(), 1.0);
    }

    #[test]
    fn test_oversized_surface_is_unavailable() {
        let result = Surface::new(100_000.0, 10.0, 1.0);
        assert!(matches!(result, Err(FieldError::SurfaceUnavailable { .. })));
    }

    #[test]
    fn test_scale_maps_viewport_to_pixels() {
        let surface = Surface::new(800.0, 600.0, 0.25).unwrap();
        assert_eq!(surface.pixel_width(), 200);
        assert_eq!(surface.pixel_height(), 150);
        assert_eq!(surface.width(), 800.0);
    }

    #[test]
    fn test_fill_circle_and_clear() {
        let mut surface = Surface::new(20.0, 20.0, 1.0).unwrap();
        surface.fill_circle(10.0, 10.0, 4.0, opaque_red());
        let centre = surface.pixel(10, 10);
        assert!(centre.a > 0.99);
        assert!(centre.r > 0.99);
        assert_eq!(surface.pixel(0, 0), Rgba::TRANSPARENT);

        surface.clear();
        assert_eq!(surface.pixel(10, 10), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_tiny_disc_still_marks_a_pixel() {
        let mut surface = Surface::new(40.0, 40.0, 0.25).unwrap();
        // radius 1 px at quarter scale is 0.25 buffer pixels
        surface.fill_circle(20.0, 20.0, 1.0, opaque_red());
        assert!(surface.pixel(5, 5).a > 0.0);
    }

    #[test]
    fn test_drawing_off_surface_is_ignored() {
        let mut surface = Surface::new(10.0, 10.0, 1.0).unwrap();
        surface.fill_circle(-50.0, -50.0, 3.0, opaque_red());
        surface.stroke_quadratic((-10.0, -10.0), (-5.0, -5.0), (-1.0, -20.0), 1.0, opaque_red(), opaque_red());
        for py in 0..10 {
            for px in 0..10 {
                assert_eq!(surface.pixel(px, py), Rgba::TRANSPARENT);
            }
        }
    }

    #[test]
    fn test_quadratic_gradient_endpoints() {
        let mut surface = Surface::new(40.0, 10.0, 1.0).unwrap();
        let blue = Rgba::new(0.0, 0.0, 1.0, 1.0);
        surface.stroke_quadratic((2.0, 5.0), (20.0, 5.0), (38.0, 5.0), 0.5, opaque_red(), blue);

        let left = surface.pixel(2, 5);
        let right = surface.pixel(37, 5);
        assert!(left.a > 0.0 && right.a > 0.0);
        assert!(left.r > left.b);
        assert!(right.b > right.r);
    }

    #[test]
    fn test_composite_over_background() {
        let mut surface = Surface::new(4.0, 4.0, 1.0).unwrap();
        surface.fill_circle(2.0, 2.0, 3.0, opaque_red());
        let image = surface.composite(|_, _| Rgba::from_rgb8(0, 0, 255));
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(2, 2).0, [255, 0, 0, 255]);
    }
}
