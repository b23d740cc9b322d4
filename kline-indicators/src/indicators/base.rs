//! Building blocks shared by the indicator implementations

use crate::data::{Interval, SeriesChange, TimeSeriesData, Timestamp};
use crate::indicators::Update;
use crate::observable::Publisher;
use crate::Result;
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};

/// Stored values of one indicator plus its `"update"` publisher.
///
/// Writes never emit; the owner decides which stored values are announced.
/// No borrow of the series is held while handlers run.
#[derive(Debug)]
pub struct IndicatorSeries {
    name: String,
    data: RefCell<TimeSeriesData>,
    updates: Publisher<Update>,
}

impl IndicatorSeries {
    /// Create new empty series
    pub fn new(name: impl Into<String>, interval: Interval) -> Self {
        Self {
            name: name.into(),
            data: RefCell::new(TimeSeriesData::new(interval)),
            updates: Publisher::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Interval {
        self.data.borrow().interval()
    }

    pub fn get_at(&self, time: Timestamp) -> Option<Decimal> {
        self.data.borrow().get_at(time).copied()
    }

    pub fn earliest(&self) -> Option<Timestamp> {
        self.data.borrow().first_time()
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.data.borrow().last_time()
    }

    pub fn updates(&self) -> &Publisher<Update> {
        &self.updates
    }

    /// Store `value` without notifying anyone
    pub fn store(&self, time: Timestamp, value: Decimal) -> SeriesChange {
        self.data.borrow_mut().add_data(time, value)
    }

    /// Merge fetched history into the stored values
    pub fn merge(&self, other: &TimeSeriesData) -> Result<()> {
        self.data.borrow_mut().merge(other)
    }

    /// Notify subscribers of the value in slot `time`
    pub fn publish(&self, time: Timestamp, value: Decimal) {
        let time = self.interval().floor(time);
        self.updates.emit(&Update { time, value });
    }

    /// Copy of the stored values
    pub fn snapshot(&self) -> TimeSeriesData {
        self.data.borrow().clone()
    }
}

/// Result of reporting one source update to an [`UpdateBarrier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// More sources still have to report this slot
    Waiting,
    /// Every source has reported; recompute now
    Complete,
    /// The update is for a slot older than the one being tracked
    Stale,
}

/// Counts updates per time slot until every source has reported.
///
/// An update for a later slot restarts the count at one. After a slot
/// completes, further updates for it count towards another recompute.
#[derive(Debug)]
pub struct UpdateBarrier {
    sources: usize,
    time: Cell<Option<Timestamp>>,
    count: Cell<usize>,
}

impl UpdateBarrier {
    /// Create new barrier over `sources` inputs
    pub fn new(sources: usize) -> Self {
        Self {
            sources,
            time: Cell::new(None),
            count: Cell::new(0),
        }
    }

    /// Record an update for slot `time`
    pub fn arrive(&self, time: Timestamp) -> Arrival {
        match self.time.get() {
            Some(current) if time < current => return Arrival::Stale,
            Some(current) if time == current => self.count.set(self.count.get() + 1),
            _ => {
                self.time.set(Some(time));
                self.count.set(1);
            }
        }

        if self.count.get() >= self.sources {
            self.count.set(0);
            Arrival::Complete
        } else {
            Arrival::Waiting
        }
    }

    /// Updates received for the tracked slot since it last completed
    pub fn pending(&self) -> usize {
        self.count.get()
    }

    /// Slot being tracked
    pub fn time(&self) -> Option<Timestamp> {
        self.time.get()
    }
}

/// Slots to compute so that a series whose newest slot is `latest` reaches
/// `time` without a hole: every slot after `latest` up to `time`, or just
/// `time` when nothing is missing.
pub(crate) fn slots_through(
    latest: Option<Timestamp>,
    time: Timestamp,
    interval: Interval,
) -> impl Iterator<Item = Timestamp> {
    let step = interval.millis();
    let time = interval.floor(time);
    let first = match latest {
        Some(latest) if latest + step < time => latest + step,
        _ => time,
    };
    (0..)
        .map(move |i| first + i * step)
        .take_while(move |t| *t <= time)
}
