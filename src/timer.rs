use chrono::{DateTime, Local};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Floor applied to any frozen phase duration before it is scored
pub const MIN_ELAPSED_SECS: f64 = 1.0;

/// Time left of `duration` since `start`, saturating at zero.
/// A `now` earlier than `start` counts as no time elapsed.
pub fn remaining(now: Instant, start: Instant, duration: Duration) -> Duration {
    duration.saturating_sub(now.saturating_duration_since(start))
}

/// Clamp a measured phase duration into `[MIN_ELAPSED_SECS, max]`.
pub fn clamp_elapsed(elapsed_secs: f64, max_secs: Option<f64>) -> f64 {
    let upper = max_secs.unwrap_or(f64::INFINITY).max(MIN_ELAPSED_SECS);

    if !elapsed_secs.is_finite() || elapsed_secs < MIN_ELAPSED_SECS {
        tracing::warn!(
            elapsed_secs,
            "elapsed time below minimum, clamping to {MIN_ELAPSED_SECS}s"
        );
        return MIN_ELAPSED_SECS.min(upper);
    }

    elapsed_secs.min(upper)
}

/// Timer for one phase: created on entry, dropped on exit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionTimer {
    pub started_at: Instant,
    pub limit: Option<Duration>,
}

impl SessionTimer {
    pub fn start(now: Instant, limit: Option<Duration>) -> Self {
        Self {
            started_at: now,
            limit,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.limit
            .map(|limit| remaining(now, self.started_at, limit))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.remaining(now), Some(left) if left.is_zero())
    }
}

/// Source of time for the session
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall_time(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to. Clones share the same offset, so a
/// test can keep a handle and advance the clock owned by an `Exercise`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Local>,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Local::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn wall_time(&self) -> DateTime<Local> {
        let offset = chrono::Duration::from_std(self.offset.get())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + offset
    }
}
