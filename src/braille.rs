use crate::color::Rgba;
use crate::surface::Surface;
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// Faint ink is brightened so a single translucent particle stays visible
const INK_GAIN: f32 = 2.5;

/// A single rendered Braille cell with position and colors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub fg: Color,
    pub bg: Color,
}

/// Viewport size in px for a canvas of terminal cells, `px_per_dot` px per
/// Braille dot on each axis
pub fn calculate_viewport(canvas_width: u16, canvas_height: u16, px_per_dot: f32) -> (f32, f32) {
    let width = (canvas_width as f32 * 2.0 * px_per_dot).max(1.0);
    let height = (canvas_height as f32 * 4.0 * px_per_dot).max(1.0);
    (width, height)
}

/// Render the surface to Braille characters.
///
/// A dot is lit when its pixel alpha reaches `threshold`. The foreground is
/// the average ink of the lit dots flattened onto the cell background;
/// `background(x, y)` gives the opaque backdrop at a viewport px position.
pub fn render_to_braille<F>(
    surface: &Surface,
    canvas_width: u16,
    canvas_height: u16,
    threshold: f32,
    background: F,
) -> Vec<BrailleCell>
where
    F: Fn(f32, f32) -> Rgba,
{
    if canvas_width == 0 || canvas_height == 0 {
        return Vec::new();
    }

    // Braille effective resolution
    let braille_width = canvas_width as usize * 2;
    let braille_height = canvas_height as usize * 4;

    // Scale factors (pre-calculated once)
    let scale_x = surface.pixel_width() as f32 / braille_width as f32;
    let scale_y = surface.pixel_height() as f32 / braille_height as f32;
    let px_per_cell_x = surface.width() / canvas_width as f32;
    let px_per_cell_y = surface.height() / canvas_height as f32;

    let mut cells = Vec::with_capacity(canvas_width as usize * canvas_height as usize);

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let mut pattern: u8 = 0;
            let mut ink = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
            let mut dot_count: usize = 0;

            // Sample the 2x4 dots for this Braille character
            let base_bx = cx as usize * 2;
            let base_by = cy as usize * 4;

            for dx in 0..2 {
                for dy in 0..4 {
                    let px = ((base_bx + dx) as f32 * scale_x) as u32;
                    let py = ((base_by + dy) as f32 * scale_y) as u32;

                    let dot = surface.pixel(px, py);
                    if dot.a >= threshold {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        dot_count += 1;
                        ink.0 += dot.r;
                        ink.1 += dot.g;
                        ink.2 += dot.b;
                        ink.3 = ink.3.max(dot.a);
                    }
                }
            }

            let bg = background(
                (cx as f32 + 0.5) * px_per_cell_x,
                (cy as f32 + 0.5) * px_per_cell_y,
            )
            .with_alpha(1.0);

            let (char, fg) = if pattern != 0 {
                let n = dot_count as f32;
                let color = Rgba::new(ink.0 / n, ink.1 / n, ink.2 / n, (ink.3 * INK_GAIN).min(1.0));
                let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');
                (braille_char, color.to_terminal(&bg))
            } else {
                (' ', bg.to_terminal(&bg))
            };

            cells.push(BrailleCell {
                x: cx,
                y: cy,
                char,
                fg,
                bg: bg.to_terminal(&bg),
            });
        }
    }

    cells
}
