use std::time::{Duration, Instant};

/// Inactivity window after which the pointer stops influencing particles
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Read-only view of the pointer handed to particle updates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSnapshot {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl PointerSnapshot {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active_at(x: f32, y: f32) -> Self {
        Self { x, y, active: true }
    }
}

/// Tracks the last pointer position and a debounced "moving" flag.
///
/// Every move restarts the countdown; the flag reads false once the
/// countdown elapses without another move.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    x: f32,
    y: f32,
    deadline: Option<Instant>,
    idle_timeout: Duration,
    pressed: bool,
    seen: bool,
}

impl PointerTracker {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            deadline: None,
            idle_timeout,
            pressed: false,
            seen: false,
        }
    }

    pub fn set_idle_timeout(&mut self, idle_timeout: Duration) {
        self.idle_timeout = idle_timeout;
    }

    /// Record a move and restart the idle countdown
    pub fn on_move(&mut self, x: f32, y: f32, now: Instant) {
        self.x = x;
        self.y = y;
        self.deadline = Some(now + self.idle_timeout);
        self.seen = true;
    }

    pub fn on_press(&mut self) {
        self.pressed = true;
    }

    pub fn on_release(&mut self) {
        self.pressed = false;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// True once the pointer has moved at least once
    pub fn has_position(&self) -> bool {
        self.seen
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn snapshot(&self, now: Instant) -> PointerSnapshot {
        if self.is_active(now) {
            PointerSnapshot::active_at(self.x, self.y)
        } else {
            PointerSnapshot {
                x: self.x,
                y: self.y,
                ..PointerSnapshot::idle()
            }
        }
    }

    /// Forget activity, e.g. when the viewport is remapped
    pub fn reset(&mut self) {
        self.deadline = None;
        self.pressed = false;
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_until_moved() {
        let tracker = PointerTracker::default();
        let now = Instant::now();
        assert!(!tracker.is_active(now));
        assert!(!tracker.has_position());
        assert_eq!(tracker.snapshot(now), PointerSnapshot::idle());
    }

    #[test]
    fn test_activity_expires_after_timeout() {
        let mut tracker = PointerTracker::default();
        let start = Instant::now();
        tracker.on_move(10.0, 20.0, start);

        let snap = tracker.snapshot(start + Duration::from_millis(1999));
        assert!(snap.active);
        assert_eq!((snap.x, snap.y), (10.0, 20.0));

        assert!(!tracker.is_active(start + IDLE_TIMEOUT));
        // Position survives going idle
        assert_eq!(tracker.position(), (10.0, 20.0));
    }

    #[test]
    fn test_move_restarts_countdown() {
        let mut tracker = PointerTracker::default();
        let start = Instant::now();
        tracker.on_move(0.0, 0.0, start);
        tracker.on_move(5.0, 5.0, start + Duration::from_millis(1500));

        assert!(tracker.is_active(start + Duration::from_millis(3000)));
        assert!(!tracker.is_active(start + Duration::from_millis(3500)));
    }

    #[test]
    fn test_press_and_reset() {
        let mut tracker = PointerTracker::default();
        let now = Instant::now();
        tracker.on_move(1.0, 1.0, now);
        tracker.on_press();
        assert!(tracker.is_pressed());
        tracker.on_release();
        assert!(!tracker.is_pressed());

        tracker.on_press();
        tracker.reset();
        assert!(!tracker.is_pressed());
        assert!(!tracker.is_active(now));
    }
}
