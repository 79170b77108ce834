//! Frame timing
//!
//! [`Timer`] measures wall-clock frames; [`FixedStep`] turns variable frame
//! times into a bounded number of fixed simulation steps.

use std::time::{Duration, Instant};

/// Wall-clock frame timer
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Mark the start of a new frame and return its duration
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        elapsed
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-step accumulator with a catch-up cap
///
/// When a frame takes longer than `max_steps * step`, the surplus is dropped
/// instead of being simulated later, so a slow frame cannot snowball.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: Duration,
    max_steps: u32,
    accumulator: Duration,
}

impl FixedStep {
    /// Create an accumulator producing steps of `step`, at most `max_steps` per frame
    pub fn new(step: Duration, max_steps: u32) -> Self {
        Self {
            step,
            max_steps: max_steps.max(1),
            accumulator: Duration::ZERO,
        }
    }

    /// Length of one step
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Feed one frame's elapsed time; returns the steps to run and the time dropped
    pub fn advance(&mut self, elapsed: Duration) -> (u32, Duration) {
        if self.step.is_zero() {
            return (0, Duration::ZERO);
        }
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }

        let mut dropped = Duration::ZERO;
        if self.accumulator >= self.step {
            dropped = self.accumulator;
            self.accumulator = Duration::ZERO;
        }
        (steps, dropped)
    }

    /// Time carried over to the next frame
    pub fn remainder(&self) -> Duration {
        self.accumulator
    }
}
