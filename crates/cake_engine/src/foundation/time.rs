//! Frame timing utilities
//!
//! The main loop samples a [`FrameTimer`] every iteration, asks a
//! [`FrameLimiter`] whether enough time has accumulated to run a frame, and
//! feeds completed frames into an [`FpsCounter`] that reports once per
//! interval.

use std::time::Instant;

/// High-precision timer for frame timing
pub struct FrameTimer {
    last_tick: Instant,
    delta_time: f32,
    total_time: f32,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
        }
    }

    /// Sample the clock and return seconds since the previous tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_tick).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_tick = now;
        self.delta_time
    }

    /// Seconds between the two most recent ticks
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total seconds accumulated across all ticks
    pub fn total_time(&self) -> f32 {
        self.total_time
    }
}

/// Accumulator that gates frames to at most `max_fps` per second
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    min_frame_time: f32,
    accumulator: f32,
}

impl FrameLimiter {
    /// Create a limiter; `max_fps == 0` disables limiting
    pub fn new(max_fps: u32) -> Self {
        let min_frame_time = if max_fps == 0 { 0.0 } else { 1.0 / max_fps as f32 };
        Self {
            min_frame_time,
            accumulator: 0.0,
        }
    }

    /// Add elapsed time and report whether a frame should run now
    ///
    /// Returns the time accumulated since the last frame that ran, which is
    /// the delta the frame should simulate.
    pub fn accumulate(&mut self, delta: f32) -> Option<f32> {
        self.accumulator += delta;
        if self.accumulator > self.min_frame_time || self.min_frame_time == 0.0 {
            let frame_delta = self.accumulator;
            self.accumulator = 0.0;
            Some(frame_delta)
        } else {
            None
        }
    }
}

/// Frames-per-second counter reporting once per interval
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: f32,
    elapsed: f32,
    frames: u32,
    last_fps: u32,
}

impl FpsCounter {
    /// Create a counter that reports every `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            frames: 0,
            last_fps: 0,
        }
    }

    /// Advance wall time without counting a frame
    ///
    /// Returns `Some(frames)` when an interval has elapsed.
    pub fn advance(&mut self, delta: f32) -> Option<u32> {
        self.elapsed += delta;
        if self.elapsed > self.interval {
            self.last_fps = self.frames;
            self.frames = 0;
            self.elapsed = 0.0;
            log::info!("FPS: {}", self.last_fps);
            Some(self.last_fps)
        } else {
            None
        }
    }

    /// Count one rendered frame
    pub fn frame(&mut self) {
        self.frames += 1;
    }

    /// Frames counted in the last completed interval
    pub fn last_fps(&self) -> u32 {
        self.last_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_holds_frames_until_budget_elapses() {
        let mut limiter = FrameLimiter::new(10);

        assert_eq!(limiter.accumulate(0.05), None);
        let delta = limiter.accumulate(0.06).expect("budget elapsed");
        assert!((delta - 0.11).abs() < 1e-6);
        assert_eq!(limiter.accumulate(0.01), None);
    }

    #[test]
    fn test_unlimited_limiter_always_runs() {
        let mut limiter = FrameLimiter::new(0);
        assert_eq!(limiter.accumulate(0.0), Some(0.0));
        assert_eq!(limiter.accumulate(0.001), Some(0.001));
    }

    #[test]
    fn test_fps_counter_reports_per_interval() {
        let mut counter = FpsCounter::new(1.0);
        for _ in 0..30 {
            counter.frame();
            assert_eq!(counter.advance(0.02), None);
        }
        counter.frame();
        assert_eq!(counter.advance(0.5), Some(31));
        assert_eq!(counter.last_fps(), 31);
        assert_eq!(counter.advance(0.1), None);
    }

    #[test]
    fn test_timer_accumulates_ticks() {
        let mut timer = FrameTimer::new();
        let first = timer.tick();
        let second = timer.tick();
        assert!(first >= 0.0 && second >= 0.0);
        assert!((timer.total_time() - (first + second)).abs() < 1e-6);
        assert!((timer.delta_time() - second).abs() < f32::EPSILON);
    }
}
