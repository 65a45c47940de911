use std::f32::consts::TAU;

/// Default edge length of one flow-field cell in px
pub const CELL_SIZE: f32 = 20.0;

const SPATIAL_FREQUENCY: f32 = 0.01;
const TEMPORAL_FREQUENCY: f32 = 0.005;

/// Steering angle in radians for grid cell `(col, row)` at tick `t`.
///
/// A smooth trigonometric stand-in for noise: no RNG, no stored grid, so two
/// calls with the same inputs return bit-identical results.
pub fn angle(col: f32, row: f32, t: f32) -> f32 {
    (col * SPATIAL_FREQUENCY + t * TEMPORAL_FREQUENCY).sin()
        * (row * SPATIAL_FREQUENCY + t * TEMPORAL_FREQUENCY).cos()
        * TAU
}

/// Shared flow field. Holds only the frame counter; angles are computed on demand.
#[derive(Debug, Clone)]
pub struct FlowField {
    tick: u64,
    cell_size: f32,
}

impl FlowField {
    pub fn new(cell_size: f32) -> Self {
        Self {
            tick: 0,
            cell_size: cell_size.max(1.0),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance time by one frame, returning the new tick
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn reset(&mut self) {
        self.tick = 0;
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = cell_size.max(1.0);
    }

    /// Grid cell containing a position
    pub fn cell_of(&self, x: f32, y: f32) -> (f32, f32) {
        ((x / self.cell_size).floor(), (y / self.cell_size).floor())
    }

    /// Flow angle at a position for the current tick
    pub fn angle_at(&self, x: f32, y: f32) -> f32 {
        let (col, row) = self.cell_of(x, y);
        angle(col, row, self.tick as f32)
    }
}

impl Default for FlowField {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_is_deterministic() {
        for &(col, row, t) in &[(0.0, 0.0, 0.0), (12.0, 7.0, 350.0), (95.0, 40.0, 123_456.0)] {
            let a = angle(col, row, t);
            let b = angle(col, row, t);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_angle_range_and_origin() {
        // sin(0) * cos(0) = 0 at the origin
        assert_eq!(angle(0.0, 0.0, 0.0), 0.0);

        for col in 0..50 {
            for row in 0..50 {
                let a = angle(col as f32, row as f32, 777.0);
                assert!(a.is_finite());
                assert!(a.abs() <= TAU + 1e-4);
            }
        }
    }

    #[test]
    fn test_cell_lookup_and_ticks() {
        let mut flow = FlowField::default();
        assert_eq!(flow.cell_of(0.0, 0.0), (0.0, 0.0));
        assert_eq!(flow.cell_of(19.9, 20.0), (0.0, 1.0));
        assert_eq!(flow.cell_of(799.0, 599.0), (39.0, 29.0));

        assert_eq!(flow.advance(), 1);
        assert_eq!(flow.advance(), 2);
        assert_eq!(flow.angle_at(45.0, 65.0), angle(2.0, 3.0, 2.0));

        flow.reset();
        assert_eq!(flow.tick(), 0);
    }
}
