//! Stopwatch used around each timed backend call.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    pub fn convert(self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        match self {
            TimeUnit::Nanoseconds => secs * 1e9,
            TimeUnit::Microseconds => secs * 1e6,
            TimeUnit::Milliseconds => secs * 1e3,
            TimeUnit::Seconds => secs,
        }
    }
}

/// Monotonic start/stop timer. Not shared across threads.
#[derive(Debug, Default)]
pub struct SimpleProfiler {
    unit: TimeUnit,
    started: Option<Instant>,
}

impl SimpleProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(unit: TimeUnit) -> Self {
        Self {
            unit,
            started: None,
        }
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Elapsed time since the last `start()`, after which the profiler is
    /// ready for the next pass.
    pub fn stop(&mut self) -> f64 {
        match self.started.take() {
            Some(started) => self.unit.convert(started.elapsed()),
            None => {
                log::warn!("SimpleProfiler::stop called without a matching start");
                0.0
            }
        }
    }
}
