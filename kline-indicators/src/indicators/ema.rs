//! EMA (Exponential Moving Average) indicator

use crate::data::{Interval, Timestamp};
use crate::indicators::{
    ensure_period, slots_through, IndicatorContext, IndicatorSeries, SingleIndicator, Update,
};
use crate::observable::{Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, trace};

/// Exponential moving average of another indicator.
///
/// `ema[T] = source[T] * k + ema[T - interval] * (1 - k)` with
/// `k = 2 / (period + 1)`. With no previous value the EMA starts at the
/// source value itself.
pub struct EmaIndicator {
    series: IndicatorSeries,
    source: Rc<dyn SingleIndicator>,
    period: u32,
    k: Decimal,
    subscription: SubscriptionId,
}

impl EmaIndicator {
    /// Create new EMA over `source`, recomputed on each source update.
    /// No history is computed. `period` must be non-zero.
    pub fn new(source: Rc<dyn SingleIndicator>, period: u32) -> Result<Rc<Self>> {
        Self::with_name(source, period, format!("EMA({period})"))
    }

    /// Like [`new`](Self::new) with a custom display name
    pub fn with_name(
        source: Rc<dyn SingleIndicator>,
        period: u32,
        name: String,
    ) -> Result<Rc<Self>> {
        ensure_period("EMA", period)?;
        let k = Decimal::TWO / Decimal::from(u64::from(period) + 1);

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = source.updates().subscribe(move |update: &Update| {
                if let Some(ema) = weak.upgrade() {
                    ema.on_source_update(update.time);
                }
            });

            Self {
                series: IndicatorSeries::new(name, source.interval()),
                source,
                period,
                k,
                subscription,
            }
        }))
    }

    /// Create new EMA and backfill the configured history length
    pub async fn create_and_init(
        source: Rc<dyn SingleIndicator>,
        period: u32,
        context: &IndicatorContext,
    ) -> Result<Rc<Self>> {
        let ema = Self::new(source, period)?;
        let start = context.history_start(ema.interval());
        info!(indicator = %ema.name(), start, "initialising EMA");
        ema.prep_history(start).await?;
        Ok(ema)
    }

    /// Smoothing period
    pub fn period(&self) -> u32 {
        self.period
    }

    /// The indicator this EMA is computed from
    pub fn source(&self) -> &Rc<dyn SingleIndicator> {
        &self.source
    }

    /// Compute and store the EMA for the slot containing `time`
    pub fn calculate(&self, time: Timestamp) -> Result<Decimal> {
        let current = self.source.require(time)?;
        let previous = self
            .series
            .get_at(time - self.interval().millis())
            .unwrap_or(current);

        let value = current * self.k + previous * (Decimal::ONE - self.k);
        self.series.store(time, value);
        trace!(indicator = %self.name(), time, %value, "calculated");
        Ok(value)
    }

    fn on_source_update(&self, time: Timestamp) {
        let mut value = None;
        for slot in slots_through(self.latest_data(), time, self.interval()) {
            match self.calculate(slot) {
                Ok(v) => value = Some(v),
                Err(e) => {
                    error!(indicator = %self.name(), time = slot, error = %e, "EMA update failed");
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
impl SingleIndicator for EmaIndicator {
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

        self.source.prep_history(start).await?;

        let (Some(earliest), Some(latest)) = (self.source.earliest_data(), self.source.latest_data())
        else {
            return Ok(());
        };
        let from = start.max(earliest);
        debug!(indicator = %self.name(), from, to = latest, "computing EMA history");

        let step = self.interval().millis();
        let mut time = from;
        while time <= latest {
            self.calculate(time)?;
            time += step;
        }
        Ok(())
    }
}

impl Drop for EmaIndicator {
    fn drop(&mut self) {
        self.source.updates().unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::IndicatorConfig;
    use crate::data::Kline;
    use crate::error::ErrorKind;
    use crate::exchange::ReplayStream;
    use crate::indicators::PriceIndicator;
    use rust_decimal::RoundingStrategy;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    const MINUTE: i64 = 60_000;

    fn minute() -> Interval {
        Interval::parse("1m").unwrap()
    }

    fn live_price() -> (Rc<ReplayStream>, Rc<PriceIndicator>) {
        let stream = Rc::new(ReplayStream::new("BTCUSDT", minute()));
        let context = IndicatorContext::new(Rc::new(ManualClock::new(0)), IndicatorConfig::default());
        let price = PriceIndicator::new(stream.clone(), context);
        (stream, price)
    }

    fn round4(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    }

    #[test]
    fn test_ema9_live() {
        let prices = [
            dec!(22.81), dec!(23.09), dec!(22.91), dec!(23.23), dec!(22.83), dec!(23.05),
            dec!(23.02), dec!(23.29), dec!(23.41), dec!(23.49), dec!(24.60),
        ];
        let expected = [
            dec!(22.8100), dec!(22.8660), dec!(22.8748), dec!(22.9458), dec!(22.9227),
            dec!(22.9481), dec!(22.9625), dec!(23.0280), dec!(23.1044), dec!(23.1815),
            dec!(23.4652),
        ];

        let (stream, price) = live_price();
        let ema = EmaIndicator::new(price, 9).unwrap();
        for (i, (p, e)) in prices.iter().zip(expected).enumerate() {
            let time = (i as i64 + 1) * MINUTE;
            stream.feed(Kline::flat(time, *p));
            assert_eq!(round4(ema.get_at(time).unwrap()), e, "slot {i}");
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let (stream, price) = live_price();
        let err = EmaIndicator::new(price.clone(), 0).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "invalid configuration: EMA period must be non-zero");
        assert_eq!(price.updates().subscriber_count(), 0);

        stream.feed(Kline::flat(0, dec!(1)));
        stream.feed(Kline::flat(MINUTE, dec!(2)));
        assert_eq!(price.get_at(MINUTE), Some(dec!(2)));
    }

    #[test]
    fn test_cold_start_equals_source() {
        let (stream, price) = live_price();
        let ema = EmaIndicator::new(price, 5).unwrap();
        stream.feed(Kline::flat(MINUTE, dec!(42.5)));
        assert_eq!(ema.get_at(MINUTE), Some(dec!(42.5)));
    }

    #[test]
    fn test_calculate_missing_source() {
        let (_stream, price) = live_price();
        let ema = EmaIndicator::new(price, 9).unwrap();
        let err = ema.calculate(MINUTE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataMissing);
        assert_eq!(err.to_string(), "BTCUSDT 1m price: data missing at 60000");
    }

    #[test]
    fn test_update_emitted_once_per_source_update() {
        let (stream, price) = live_price();
        let ema = EmaIndicator::new(price, 3).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ema.updates().subscribe(move |u: &Update| sink.borrow_mut().push(u.time));

        stream.feed(Kline::flat(MINUTE, dec!(1)));
        stream.feed(Kline::flat(MINUTE, dec!(2)));
        stream.feed(Kline::flat(2 * MINUTE, dec!(3)));

        assert_eq!(*seen.borrow(), vec![MINUTE, MINUTE, 2 * MINUTE]);
        // The revised slot restarted from the new price.
        assert_eq!(ema.get_at(MINUTE), Some(dec!(2)));
    }

    #[test]
    fn test_live_gap_is_caught_up() {
        let (stream, price) = live_price();
        let ema = EmaIndicator::new(price, 1).unwrap();
        stream.feed(Kline::flat(MINUTE, dec!(1)));
        stream.feed(Kline::flat(4 * MINUTE, dec!(4)));

        // Period 1 tracks the source exactly, including filled slots.
        assert_eq!(ema.window(4 * MINUTE, 4).unwrap(), vec![dec!(1), dec!(1), dec!(1), dec!(4)]);
    }

    #[tokio::test]
    async fn test_prep_history() {
        let stream = Rc::new(
            ReplayStream::new("BTCUSDT", minute())
                .with_history((0..3).map(|i| Kline::flat(i * MINUTE, dec!(10)))),
        );
        let clock = Rc::new(ManualClock::new(2 * MINUTE));
        let context = IndicatorContext::new(clock, IndicatorConfig::default().with_history_length(2));
        let price = PriceIndicator::new(stream, context.clone());

        let ema = EmaIndicator::create_and_init(price, 3, &context).await.unwrap();
        assert_eq!(ema.earliest_data(), Some(0));
        assert_eq!(ema.latest_data(), Some(2 * MINUTE));
        assert_eq!(ema.get_at(MINUTE), Some(dec!(10)));

        // Covered already: nothing recomputed, nothing fetched.
        ema.prep_history(MINUTE).await.unwrap();
        assert_eq!(ema.earliest_data(), Some(0));
    }

    #[test]
    fn test_dropped_ema_unsubscribes() {
        let (_stream, price) = live_price();
        let ema = EmaIndicator::new(price.clone(), 3).unwrap();
        assert_eq!(price.updates().subscriber_count(), 1);
        drop(ema);
        assert_eq!(price.updates().subscriber_count(), 0);
    }
}
