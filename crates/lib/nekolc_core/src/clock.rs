//! Wall-clock abstraction.
//!
//! Token lifetimes and the replay window are evaluated against a `Clock`
//! so tests can move time without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock with second resolution.
#[derive(Debug)]
pub struct ManualClock {
    unix_secs: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            unix_secs: AtomicI64::new(start.timestamp()),
        }
    }

    /// Creates a clock frozen at the current wall-clock second.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Moves the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        self.unix_secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        self.unix_secs.store(to.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.unix_secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}
