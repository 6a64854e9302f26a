//! Frame timer used by the render loop.

use std::time::{Duration, Instant};

/// Measures frame deltas and reports a frames-per-second average once per
/// reporting window.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    window_start: Instant,
    window_frames: u32,
    report_every: Duration,
}

impl Timer {
    /// Create a timer that reports once per second.
    pub fn new() -> Self {
        Self::with_report_interval(Duration::from_secs(1))
    }

    /// Create a timer with a custom reporting window.
    pub fn with_report_interval(report_every: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            window_start: now,
            window_frames: 0,
            report_every,
        }
    }

    /// Total time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time since the previous `tick()`, and advance.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Count one presented frame.
    ///
    /// Returns the average frame rate when the reporting window has elapsed,
    /// then starts a new window.
    pub fn frame_presented(&mut self) -> Option<f32> {
        self.window_frames += 1;
        let window = self.window_start.elapsed();
        if window < self.report_every {
            return None;
        }

        let fps = self.window_frames as f32 / window.as_secs_f32();
        self.window_start = Instant::now();
        self.window_frames = 0;
        Some(fps)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_monotonic() {
        let mut timer = Timer::new();
        let first = timer.tick();
        let second = timer.tick();
        assert!(first <= timer.elapsed());
        assert!(second <= timer.elapsed());
    }

    #[test]
    fn test_frame_report_after_window() {
        let mut timer = Timer::with_report_interval(Duration::ZERO);
        let fps = timer.frame_presented();
        assert!(fps.is_some());
        assert!(fps.unwrap() > 0.0);
    }

    #[test]
    fn test_no_report_inside_window() {
        let mut timer = Timer::with_report_interval(Duration::from_secs(3600));
        assert!(timer.frame_presented().is_none());
        assert!(timer.frame_presented().is_none());
    }
}
