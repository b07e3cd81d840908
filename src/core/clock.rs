//! Wall Clock
//!
//! Table state stores times as millisecond timestamps. The rules never read
//! the clock themselves: the caller samples a [`Clock`] once per command or
//! tick and hands the value down, so tests drive time with [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch. Zero means "unset".
pub type Timestamp = i64;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Real time via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Test clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self { now: AtomicI64::new(start) }
    }

    /// Move the clock forward.
    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    /// Jump to an absolute time.
    pub fn set(&self, at: Timestamp) {
        self.now.store(at, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// True once `ms` milliseconds have elapsed since `since`.
#[inline]
pub fn have_passed_ms(now: Timestamp, since: Timestamp, ms: i64) -> bool {
    now - since >= ms
}

/// `at` shifted by fractional seconds.
#[inline]
pub fn add_seconds(at: Timestamp, seconds: f64) -> Timestamp {
    at + (seconds * 1000.0).round() as i64
}

/// Whole seconds, as sent to clients.
#[inline]
pub fn to_seconds(at: Timestamp) -> i64 {
    at / 1000
}
