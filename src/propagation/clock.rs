//! Time source for propagation and pulse slots.
//!
//! The engine never reads the system clock directly. `SystemClock` is used in
//! the running session; `ManualClock` makes traces byte-identical across runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary, fixed origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock: advances by a fixed tick on every read and can be
/// moved forward explicitly.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    tick_nanos: u64,
}

impl ManualClock {
    /// A clock that only moves when [`ManualClock::advance`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that moves forward by `tick` each time it is read.
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            tick_nanos: tick.as_nanos() as u64,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let t = self.nanos.fetch_add(self.tick_nanos, Ordering::SeqCst);
        Duration::from_nanos(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_ticks_per_read() {
        let clock = ManualClock::with_tick(Duration::from_micros(10));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_micros(10));
        clock.advance(Duration::from_millis(1));
        assert_eq!(clock.now(), Duration::from_micros(1020));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
