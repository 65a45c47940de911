use std::time::{Duration, Instant};

/// "Schedule the next tick" capability behind the frame loop.
///
/// The loop asks how long it may wait for input, then whether a frame is
/// due. Once cancelled no further frames are released; cancelling twice is
/// harmless.
pub trait FrameScheduler {
    /// How long the caller may block before the next frame is due
    fn time_until_due(&self, now: Instant) -> Duration;

    /// Consume the pending frame if it is due. Returns false after cancel.
    fn take_due(&mut self, now: Instant) -> bool;

    fn cancel(&mut self);

    fn is_cancelled(&self) -> bool;
}

/// Fixed frame rate clock for the interactive terminal loop
#[derive(Debug, Clone)]
pub struct FixedRateScheduler {
    interval: Duration,
    next_due: Instant,
    cancelled: bool,
}

impl FixedRateScheduler {
    pub fn new(fps: u32, now: Instant) -> Self {
        Self {
            interval: interval_for(fps),
            next_due: now,
            cancelled: false,
        }
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.interval = interval_for(fps);
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

impl FrameScheduler for FixedRateScheduler {
    fn time_until_due(&self, now: Instant) -> Duration {
        if self.cancelled {
            return Duration::ZERO;
        }
        self.next_due.saturating_duration_since(now)
    }

    fn take_due(&mut self, now: Instant) -> bool {
        if self.cancelled || now < self.next_due {
            return false;
        }
        // Drop missed frames instead of bursting to catch up
        let next = self.next_due + self.interval;
        self.next_due = if next <= now { now + self.interval } else { next };
        true
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Releases exactly `frames` frames, without waiting, then cancels itself.
/// Drives the field in tests and in headless recording.
#[derive(Debug, Clone)]
pub struct ManualStepper {
    remaining: usize,
    cancelled: bool,
}

impl ManualStepper {
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            cancelled: frames == 0,
        }
    }
}

impl FrameScheduler for ManualStepper {
    fn time_until_due(&self, _now: Instant) -> Duration {
        Duration::ZERO
    }

    fn take_due(&mut self, _now: Instant) -> bool {
        if self.cancelled {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.cancelled = true;
        }
        true
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        self.remaining = 0;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Run frames until the scheduler is cancelled, sleeping between frames.
/// `on_frame` returns false to stop the loop early. Returns frames run.
pub fn run_until_cancelled<S, F>(scheduler: &mut S, mut on_frame: F) -> usize
where
    S: FrameScheduler,
    F: FnMut(Instant) -> bool,
{
    let mut frames = 0;
    while !scheduler.is_cancelled() {
        let now = Instant::now();
        let wait = scheduler.time_until_due(now);
        if !wait.is_zero() {
            std::thread::sleep(wait);
            continue;
        }
        if scheduler.take_due(now) {
            frames += 1;
            if !on_frame(now) {
                scheduler.cancel();
            }
        }
    }
    frames
}
