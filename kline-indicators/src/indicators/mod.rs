//! Technical indicators module
//!
//! Indicators form a graph: a [`PriceIndicator`] is fed by a price stream,
//! and every derived indicator subscribes to the `"update"` events of the
//! indicators it is computed from. All values are exact decimals.
//!
//! Indicators are shared as `Rc<...>` and mutate through interior
//! mutability; the whole graph lives on one thread.

pub mod base;
pub mod calc;
pub mod cross;
pub mod difference;
pub mod ema;
pub mod macd;
pub mod multi_ema;
pub mod price;
pub mod rsi;

pub use base::*;
pub use calc::*;
pub use cross::*;
pub use difference::*;
pub use ema::*;
pub use macd::*;
pub use multi_ema::*;
pub use price::*;
pub use rsi::*;

use crate::clock::{Clock, SystemClock};
use crate::config::IndicatorConfig;
use crate::data::{Interval, Timestamp};
use crate::error::Error;
use crate::observable::{Event, Publisher};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;
use std::rc::Rc;

/// A new or revised value of a single indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub time: Timestamp,
    pub value: Decimal,
}

impl Event for Update {
    fn name(&self) -> &'static str {
        "update"
    }
}

/// Indicator producing one value per interval slot
#[async_trait(?Send)]
pub trait SingleIndicator {
    /// Display name, e.g. "EMA(9)"
    fn name(&self) -> &str;

    /// Sample interval
    fn interval(&self) -> Interval;

    /// Value in the slot containing `time`, if computed
    fn get_at(&self, time: Timestamp) -> Option<Decimal>;

    /// Time of the oldest computed slot
    fn earliest_data(&self) -> Option<Timestamp>;

    /// Time of the newest computed slot
    fn latest_data(&self) -> Option<Timestamp>;

    /// `"update"` events, one per computed slot
    fn updates(&self) -> &Publisher<Update>;

    /// Make sure values exist from `start` onward, fetching and computing
    /// history as needed
    async fn prep_history(&self, start: Timestamp) -> Result<()>;

    /// Like [`get_at`](Self::get_at), but a missing value is an error
    fn require(&self, time: Timestamp) -> Result<Decimal> {
        self.get_at(time)
            .ok_or_else(|| Error::data_missing(self.name(), time))
    }

    /// `n` consecutive values ending at `end_time`, oldest first
    fn window(&self, end_time: Timestamp, n: usize) -> Option<Vec<Decimal>> {
        if n == 0 {
            return None;
        }
        let step = self.interval().millis();
        let start = self.interval().floor(end_time) - (n as i64 - 1) * step;
        (0..n as i64)
            .map(|i| self.get_at(start + i * step))
            .collect()
    }
}

/// Indicator combining several single indicators on one interval
#[async_trait(?Send)]
pub trait MultiIndicator {
    /// Shared interval of every member
    fn interval(&self) -> Interval;

    /// Every member's value at `time`
    fn get_all(&self, time: Timestamp) -> Result<Vec<Decimal>>;

    /// Backfill every member from `start`
    async fn prep_history(&self, start: Timestamp) -> Result<()>;
}

/// Time source and settings handed to every indicator constructor
#[derive(Clone)]
pub struct IndicatorContext {
    clock: Rc<dyn Clock>,
    config: IndicatorConfig,
}

impl IndicatorContext {
    /// Create new context
    pub fn new(clock: Rc<dyn Clock>, config: IndicatorConfig) -> Self {
        Self { clock, config }
    }

    /// Wall clock with default settings
    pub fn system() -> Self {
        Self::new(Rc::new(SystemClock), IndicatorConfig::default())
    }

    /// Current time
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Where initial backfill starts: `ema_history_length` whole intervals
    /// before the current slot
    pub fn history_start(&self, interval: Interval) -> Timestamp {
        let intervals = i64::try_from(self.config.ema_history_length).unwrap_or(i64::MAX);
        interval
            .floor(self.now())
            .saturating_sub(intervals.saturating_mul(interval.millis()))
    }
}

impl fmt::Debug for IndicatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorContext")
            .field("now", &self.now())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for IndicatorContext {
    fn default() -> Self {
        Self::system()
    }
}

pub(crate) fn ensure_period(indicator: &str, period: u32) -> Result<()> {
    if period == 0 {
        return Err(Error::InvalidConfig(format!("{indicator} period must be non-zero")));
    }
    Ok(())
}

pub(crate) fn ensure_same_interval(expected: Interval, found: Interval) -> Result<()> {
    if expected != found {
        return Err(Error::IntervalMismatch { expected, found });
    }
    Ok(())
}
