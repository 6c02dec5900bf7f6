//! Millisecond clock sources.
//!
//! Timer deadlines are absolute millisecond counts since a fixed epoch. The
//! clock is injected wherever a deadline is computed or evaluated, so tests
//! can drive time by hand with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of "total milliseconds elapsed since a fixed reference point".
///
/// Implementations must be monotonically non-decreasing; the timer queue does
/// not handle a clock that goes backwards.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since 1970-01-01 00:00 (UTC), advanced monotonically.
///
/// The wall-clock time is sampled once at construction and every later
/// reading adds the monotonic time elapsed since then, so wall-clock
/// adjustments never move deadlines.
#[derive(Debug)]
pub struct SystemClock {
    anchor_ms: u64,
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            anchor_ms,
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor_ms
            .saturating_add(self.start.elapsed().as_millis() as u64)
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```rust
/// use evmux::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0);
/// clock.advance(10);
/// assert_eq!(clock.now_ms(), 10);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::AcqRel);
    }

    /// Jumps to an absolute time.
    ///
    /// # Panics
    ///
    /// Panics if `ms` is earlier than the current reading.
    pub fn set(&self, ms: u64) {
        let previous = self.now.load(Ordering::Acquire);
        assert!(previous <= ms, "ManualClock must not go backwards");

        self.now.store(ms, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();

        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn manual_clock_moves_only_on_demand() {
        let clock = ManualClock::new(5);
        assert_eq!(clock.now_ms(), 5);

        clock.advance(7);
        assert_eq!(clock.now_ms(), 12);

        clock.set(40);
        assert_eq!(clock.now_ms(), 40);
    }

    #[test]
    #[should_panic(expected = "must not go backwards")]
    fn manual_clock_rejects_rollback() {
        let clock = ManualClock::new(10);
        clock.set(3);
    }
}
