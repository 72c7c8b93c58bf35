use std::time::{Duration, Instant};

/// Frames-per-second accumulator for one worker loop.
#[derive(Debug, Default, Clone)]
pub struct FpsCounter {
    started: Option<Instant>,
    stopped: Option<Instant>,
    frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub fps: f64,
    /// Results evicted from the worker's queue before the consumer took them.
    pub dropped: u64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.stopped = None;
        self.frames = 0;
    }

    pub fn update(&mut self) {
        self.frames += 1;
    }

    /// Freeze the elapsed time. Calling it again, or before `start`, is a no-op.
    pub fn stop(&mut self) {
        if self.started.is_some() && self.stopped.is_none() {
            self.stopped = Some(Instant::now());
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn fps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }

    pub fn summary(&self, dropped: u64) -> FpsSummary {
        FpsSummary {
            frames: self.frames,
            elapsed: self.elapsed(),
            fps: self.fps(),
            dropped,
        }
    }
}
