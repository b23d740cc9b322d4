//! Gapless, interval-aligned time series storage
//!
//! A [`TimeSeriesData`] holds exactly one value per interval slot between its
//! first and last time. Slots that were never written are filled from a
//! neighbouring value as the series grows, so indexing is always
//! `(time - first_time) / interval`.

use crate::data::{Interval, Timestamp};
use crate::error::Error;
use crate::Result;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// What an [`TimeSeriesData::add_data`] call did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesChange {
    /// First sample of an empty series
    Initialized,
    /// Appended after the last slot, `filled` gap slots repeated the old last value
    Extended { filled: usize },
    /// Inserted before the first slot, `filled` gap slots repeated the new value
    Prepended { filled: usize },
    /// Overwrote an existing slot
    Replaced,
}

/// Gapless series of one value per interval slot
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData<T = Decimal> {
    interval: Interval,
    first_time: Timestamp,
    last_time: Timestamp,
    data: VecDeque<T>,
}

impl<T: Clone> TimeSeriesData<T> {
    /// Create new empty series
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            first_time: 0,
            last_time: 0,
            data: VecDeque::new(),
        }
    }

    /// Build a series from `(time, value)` samples, oldest first.
    /// Missing slots are forward filled.
    pub fn from_samples(interval: Interval, samples: impl IntoIterator<Item = (Timestamp, T)>) -> Self {
        let mut series = Self::new(interval);
        for (time, value) in samples {
            series.add_data(time, value);
        }
        series
    }

    /// Sample interval
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Whether any sample has been added
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Time of the first slot
    pub fn first_time(&self) -> Option<Timestamp> {
        self.has_data().then_some(self.first_time)
    }

    /// Time of the last slot
    pub fn last_time(&self) -> Option<Timestamp> {
        self.has_data().then_some(self.last_time)
    }

    /// Value of the last slot
    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    /// Add a sample at `time`, rounded down to its interval slot.
    ///
    /// After the last slot, any gap is filled with copies of the old last
    /// value. Before the first slot, any gap is filled with copies of
    /// `value`. Inside the range the slot is overwritten.
    pub fn add_data(&mut self, time: Timestamp, value: T) -> SeriesChange {
        let time = self.interval.floor(time);

        if self.data.is_empty() {
            self.data.push_back(value);
            self.first_time = time;
            self.last_time = time;
            return SeriesChange::Initialized;
        }

        if time > self.last_time {
            let filled = self.fill_trailing(time - self.interval.millis());
            self.data.push_back(value);
            self.last_time = time;
            SeriesChange::Extended { filled }
        } else if time < self.first_time {
            let filled = self.fill_leading(time + self.interval.millis(), &value);
            self.data.push_front(value);
            self.first_time = time;
            SeriesChange::Prepended { filled }
        } else {
            let index = self.index_of(time);
            self.data[index] = value;
            SeriesChange::Replaced
        }
    }

    /// Value in the slot containing `time`, or `None` outside the series
    pub fn get_at(&self, time: Timestamp) -> Option<&T> {
        let time = self.interval.floor(time);
        if !self.has_data() || time < self.first_time || time > self.last_time {
            return None;
        }
        self.data.get(self.index_of(time))
    }

    /// Merge `other` into this series. `other` wins where both have data;
    /// a gap between the two ranges is filled from the value on its near side.
    pub fn merge(&mut self, other: &TimeSeriesData<T>) -> Result<()> {
        if other.interval != self.interval {
            return Err(Error::IntervalMismatch {
                expected: self.interval,
                found: other.interval,
            });
        }
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.clone_from(other);
            return Ok(());
        }

        if other.first_time < self.first_time {
            // Seed with other's newest value so the history meets existing data.
            if let Some(seed) = other.last() {
                self.fill_leading(other.first_time, seed);
            }
        }

        for (time, value) in other.iter() {
            self.add_data(time, value.clone());
        }
        Ok(())
    }

    /// The `n` most recent samples, oldest first, after forward filling up
    /// to `now`. With `include_open == false` the newest slot is left out
    /// while it is still open. Returns fewer than `n` if fewer exist.
    pub fn recent(&mut self, n: NonZeroUsize, now: Timestamp, include_open: bool) -> Vec<T> {
        if self.data.is_empty() {
            return Vec::new();
        }

        let now_slot = self.interval.floor(now);
        self.fill_trailing(now_slot);
        let last_open = now - self.last_time < self.interval.millis();

        let len = self.data.len();
        let n = n.get();
        if include_open || !last_open {
            self.data.range(len.saturating_sub(n)..).cloned().collect()
        } else {
            let end = len - 1;
            self.data.range(end.saturating_sub(n)..end).cloned().collect()
        }
    }

    /// `n` consecutive samples ending at `end_time` (inclusive), oldest first.
    /// `None` unless every one of them is present.
    pub fn window(&self, end_time: Timestamp, n: usize) -> Option<Vec<T>> {
        if n == 0 {
            return None;
        }
        let end_time = self.interval.floor(end_time);
        let span = i64::try_from(n).ok()? - 1;
        let start_time = end_time - span * self.interval.millis();
        if !self.has_data() || start_time < self.first_time || end_time > self.last_time {
            return None;
        }

        let start = self.index_of(start_time);
        Some(self.data.range(start..start + n).cloned().collect())
    }

    /// Iterate `(time, value)` pairs, oldest first
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &T)> + '_ {
        let first = self.first_time;
        let step = self.interval.millis();
        self.data
            .iter()
            .enumerate()
            .map(move |(i, value)| (first + i as i64 * step, value))
    }

    /// Iterate values, oldest first
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    fn index_of(&self, time: Timestamp) -> usize {
        self.interval.steps(self.first_time, time) as usize
    }

    // Extend with copies of the last value so that `last_time` becomes
    // `time`. No-op unless `time` is at least one interval past the end.
    fn fill_trailing(&mut self, time: Timestamp) -> usize {
        let time = self.interval.floor(time);
        if time - self.last_time < self.interval.millis() {
            return 0;
        }
        let Some(last) = self.data.back().cloned() else {
            return 0;
        };

        let missing = self.interval.steps(self.last_time, time) as usize;
        self.data.extend(std::iter::repeat(last).take(missing));
        self.last_time = time;
        missing
    }

    // Prepend copies of `value` so that `first_time` becomes `time`.
    // No-op unless `time` is at least one interval before the start.
    fn fill_leading(&mut self, time: Timestamp, value: &T) -> usize {
        let time = self.interval.floor(time);
        if self.first_time - time < self.interval.millis() {
            return 0;
        }

        let missing = self.interval.steps(time, self.first_time) as usize;
        for _ in 0..missing {
            self.data.push_front(value.clone());
        }
        self.first_time = time;
        missing
    }
}
