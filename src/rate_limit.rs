//! Rate limiting for outbound interpreter calls
//!
//! The filename interpreter is a paid, rate-limited remote service. Every
//! call is gated through a [`RateLimiter`] which enforces a fixed minimum
//! interval between consecutive calls.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Default minimum interval between two interpreter calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Source of time for the rate limiter
///
/// Production code uses [`SystemClock`]; tests substitute a fake clock so
/// that waiting does not actually block.
pub trait Clock {
    /// Returns the current instant
    fn now(&self) -> Instant;

    /// Blocks the calling thread for the given duration
    fn sleep(&self, duration: Duration);
}

/// Clock backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Throttles calls to at most one per `min_interval`
///
/// The first call to [`RateLimiter::wait`] never blocks. Every later call
/// blocks until at least `min_interval` has elapsed since the previous call
/// returned.
pub struct RateLimiter {
    min_interval: Duration,
    clock: Box<dyn Clock>,
    /// Instant at which the previous `wait()` returned
    last_call: Cell<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a rate limiter using the system clock
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Box::new(SystemClock))
    }

    /// Creates a rate limiter using the given clock
    pub fn with_clock(min_interval: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last_call: Cell::new(None),
        }
    }

    /// The configured minimum interval between calls
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until the next call is allowed
    pub fn wait(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                tracing::debug!(wait = ?remaining, "rate limiting interpreter call");
                self.clock.sleep(remaining);
            }
        }

        self.last_call.set(Some(self.clock.now()));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock whose time only advances when slept on or advanced manually
    #[derive(Clone)]
    pub(crate) struct FakeClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
        total_slept: Rc<Cell<Duration>>,
    }

    impl FakeClock {
        pub(crate) fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
                total_slept: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        pub(crate) fn advance(&self, duration: Duration) {
            self.offset.set(self.offset.get() + duration);
        }

        pub(crate) fn elapsed(&self) -> Duration {
            self.offset.get()
        }

        pub(crate) fn total_slept(&self) -> Duration {
            self.total_slept.get()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.total_slept.set(self.total_slept.get() + duration);
            self.advance(duration);
        }
    }

    #[test]
    fn test_first_call_never_blocks() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock.clone()));

        limiter.wait();

        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[test]
    fn test_consecutive_calls_are_spaced() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock.clone()));

        for _ in 0..5 {
            limiter.wait();
        }

        // N calls take at least (N - 1) intervals
        assert!(clock.elapsed() >= Duration::from_secs(8));
        assert_eq!(clock.total_slept(), Duration::from_secs(8));
    }

    #[test]
    fn test_only_remaining_interval_is_waited() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock.clone()));

        limiter.wait();
        clock.advance(Duration::from_millis(1500));
        limiter.wait();

        assert_eq!(clock.total_slept(), Duration::from_millis(500));
    }

    #[test]
    fn test_interval_counts_from_last_return() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock.clone()));

        limiter.wait();
        limiter.wait();
        clock.advance(Duration::from_secs(1));
        limiter.wait();

        // The second call returned after sleeping, so only one more second is owed
        assert_eq!(clock.total_slept(), Duration::from_secs(3));
    }

    #[test]
    fn test_no_wait_after_interval_elapsed() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock.clone()));

        limiter.wait();
        clock.advance(Duration::from_secs(3));
        limiter.wait();

        assert_eq!(clock.total_slept(), Duration::ZERO);
    }
}
