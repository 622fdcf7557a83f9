//! Monotonic time sources.
//!
//! The engine samples time as `f64` seconds since an arbitrary origin. The
//! source is injectable so prediction and input accumulation can be tested
//! against a scripted clock.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// A monotonic clock reading seconds.
pub trait TimeSource: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// Wall-clock backed monotonic time, zero at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            seconds: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to an absolute reading. Going backwards is ignored.
    pub fn set(&self, seconds: f64) {
        let mut now = self.seconds.lock();
        if seconds > *now {
            *now = seconds;
        }
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        *self.seconds.lock() += seconds.max(0.0);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        *self.seconds.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn monotonic_clock_never_decreases() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a >= 0.0);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(1.0);
        let other = clock.clone();
        clock.advance(0.25);
        assert_relative_eq!(other.now(), 1.25);
    }

    #[test]
    fn manual_clock_stays_monotonic() {
        let clock = ManualClock::new(2.0);
        clock.set(1.0);
        assert_relative_eq!(clock.now(), 2.0);
        clock.advance(-1.0);
        assert_relative_eq!(clock.now(), 2.0);
        clock.set(3.5);
        assert_relative_eq!(clock.now(), 3.5);
    }
}
