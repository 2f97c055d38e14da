//! Injectable monotonic clock.
//!
//! Every blocking loop in the scan engine reads time through the [`Clock`]
//! trait instead of the wall clock, so the whole engine can run under a
//! [`ManualClock`] in tests without real delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source used by all deadline and polling loops.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Blocks the calling thread for `period`.
    fn sleep(&self, period: Duration);
}

/// Real clock backed by [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, period: Duration) {
        std::thread::sleep(period);
    }
}

/// Deterministic clock advanced explicitly by the test harness or by a
/// simulated transport. `sleep` advances the clock instead of blocking.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed_ns: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `period`.
    pub fn advance(&self, period: Duration) {
        self.elapsed_ns
            .fetch_add(period.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Relaxed))
    }

    fn sleep(&self, period: Duration) {
        self.advance(period);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, period: Duration) {
        (**self).sleep(period)
    }
}
