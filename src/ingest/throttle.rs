//! Time-gated snapshot publication.
//!
//! Scheduling policy only: the caller decides what to publish once `ready()`
//! says yes. Time comes from a `Clock` so tests can drive it by hand.

use std::time::{Duration, Instant};

/// Monotonic wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Allows at most one publish per `interval`, measured from the last publish.
///
/// The first call always passes; `force` bypasses the window (and restarts it).
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn ready(&mut self, clock: &dyn Clock, force: bool) -> bool {
        let now = clock.now();
        if !force {
            if let Some(last) = self.last {
                if now.saturating_duration_since(last) < self.interval {
                    return false;
                }
            }
        }
        self.last = Some(now);
        true
    }
}
