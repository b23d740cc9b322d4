//! RSI (Relative Strength Index) indicator

use crate::data::{Interval, TimeSeriesData, Timestamp};
use crate::error::{Error, ErrorKind};
use crate::indicators::{
    average_gain, average_loss, ensure_period, slots_through, IndicatorContext, IndicatorSeries,
    SingleIndicator, Update,
};
use crate::observable::{Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, trace};

/// Default RSI period
pub const DEFAULT_RSI_PERIOD: u32 = 14;

/// Wilder's relative strength index of another indicator.
///
/// The first value averages the gains and losses of the `period` changes
/// ending at that slot. Later values smooth the previous averages:
/// `avg = (prev * (period - 1) + change) / period`.
pub struct RsiIndicator {
    series: IndicatorSeries,
    averages: RefCell<TimeSeriesData<(Decimal, Decimal)>>,
    source: Rc<dyn SingleIndicator>,
    period: u32,
    subscription: SubscriptionId,
}

impl RsiIndicator {
    /// Create new RSI over `source`. No history is computed. `period` must
    /// be non-zero.
    pub fn new(source: Rc<dyn SingleIndicator>, period: u32) -> Result<Rc<Self>> {
        ensure_period("RSI", period)?;
        let interval = source.interval();

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = source.updates().subscribe(move |update: &Update| {
                if let Some(rsi) = weak.upgrade() {
                    rsi.on_source_update(update.time);
                }
            });

            Self {
                series: IndicatorSeries::new(format!("RSI({period})"), interval),
                averages: RefCell::new(TimeSeriesData::new(interval)),
                source,
                period,
                subscription,
            }
        }))
    }

    /// Create new RSI and backfill the configured history length
    pub async fn create_and_init(
        source: Rc<dyn SingleIndicator>,
        period: u32,
        context: &IndicatorContext,
    ) -> Result<Rc<Self>> {
        let rsi = Self::new(source, period)?;
        let start = context.history_start(rsi.interval());
        info!(indicator = %rsi.name(), start, "initialising RSI");
        rsi.prep_history(start).await?;
        Ok(rsi)
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Compute and store the RSI for the slot containing `time`
    pub fn calculate(&self, time: Timestamp) -> Result<Decimal> {
        let time = self.interval().floor(time);
        let prev_time = time - self.interval().millis();
        let n = Decimal::from(self.period);

        let previous = self.averages.borrow().get_at(prev_time).copied();
        let (gain, loss) = match previous {
            Some((prev_gain, prev_loss)) => {
                let change = self.source.require(time)? - self.source.require(prev_time)?;
                let smooth = |prev: Decimal, step: Decimal| (prev * (n - Decimal::ONE) + step) / n;
                (
                    smooth(prev_gain, change.max(Decimal::ZERO)),
                    smooth(prev_loss, (-change).max(Decimal::ZERO)),
                )
            }
            None => {
                let window = self
                    .source
                    .window(time, self.period as usize + 1)
                    .ok_or_else(|| Error::data_missing(self.source.name(), time))?;
                let gain = average_gain(&window).unwrap_or_default();
                let loss = average_loss(&window).unwrap_or_default();
                (gain, loss)
            }
        };

        let value = if loss.is_zero() {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + gain / loss)
        };

        self.averages.borrow_mut().add_data(time, (gain, loss));
        self.series.store(time, value);
        trace!(indicator = %self.name(), time, %value, "calculated");
        Ok(value)
    }

    fn on_source_update(&self, time: Timestamp) {
        let mut value = None;
        for slot in slots_through(self.latest_data(), time, self.interval()) {
            match self.calculate(slot) {
                Ok(v) => value = Some(v),
                Err(e) if e.kind() == ErrorKind::DataMissing && self.latest_data().is_none() => {
                    debug!(indicator = %self.name(), time = slot, "not enough data yet");
                    return;
                }
                Err(e) => {
                    error!(indicator = %self.name(), time = slot, error = %e, "RSI update failed");
                    return;
                }
            }
        }

        if let Some(value) = value {
            self.series.publish(time, value);
        }
    }
}

#[async_trait(?Send)]
impl SingleIndicator for RsiIndicator {
    fn name(&self) -> &str {
        self.series.name()
    }

    fn interval(&self) -> Interval {
        self.series.interval()
    }

    fn get_at(&self, time: Timestamp) -> Option<Decimal> {
        self.series.get_at(time)
    }

    fn earliest_data(&self) -> Option<Timestamp> {
        self.series.earliest()
    }

    fn latest_data(&self) -> Option<Timestamp> {
        self.series.latest()
    }

    fn updates(&self) -> &Publisher<Update> {
        self.series.updates()
    }

    async fn prep_history(&self, start: Timestamp) -> Result<()> {
        let start = self.interval().floor(start);
        if self.earliest_data().is_some_and(|earliest| start >= earliest) {
            return Ok(());
        }

        let step = self.interval().millis();
        let lookback = i64::from(self.period) * step;
        self.source.prep_history(start - lookback).await?;

        let (Some(earliest), Some(latest)) = (self.source.earliest_data(), self.source.latest_data())
        else {
            return Ok(());
        };
        let from = start.max(earliest + lookback);
        debug!(indicator = %self.name(), from, to = latest, "computing RSI history");

        let mut time = from;
        while time <= latest {
            self.calculate(time)?;
            time += step;
        }
        Ok(())
    }
}

impl Drop for RsiIndicator {
    fn drop(&mut self) {
        self.source.updates().unsubscribe(self.subscription);
    }
}
