use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::types::{EpochId, SECONDS_PER_EPOCH};

/// Source of wall-clock time for funding and settlement.
///
/// A day is exactly 86,400 seconds since unix epoch zero; no calendar,
/// timezone, or leap-second handling. This is the sole time source the
/// engines consume.
pub trait EpochClock: Send + Sync {
    /// Current unix time in seconds.
    fn unix_now(&self) -> i64;

    /// Current epoch number, `floor(unix_now / 86_400)`.
    fn epoch_now(&self) -> EpochId {
        (self.unix_now() / SECONDS_PER_EPOCH) as EpochId
    }
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl EpochClock for SystemClock {
    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually driven clock for tests and demos.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn starting_at(unix_seconds: i64) -> Self {
        Self {
            now: AtomicI64::new(unix_seconds),
        }
    }

    pub fn set(&self, unix_seconds: i64) {
        self.now.store(unix_seconds, Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::Relaxed);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(days * SECONDS_PER_EPOCH);
    }
}

impl EpochClock for ManualClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}
