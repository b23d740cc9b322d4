//! Time source used by indicators
//!
//! Indicators never read the wall clock directly, so a backtest driver can
//! substitute a [`ManualClock`] and step it alongside the data it replays.

use crate::data::Timestamp;
use chrono::Utc;
use std::cell::Cell;

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    /// Create new clock stopped at `now`
    pub fn new(now: Timestamp) -> Self {
        Self { now: Cell::new(now) }
    }

    /// Set the current time
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    /// Move the clock forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}
