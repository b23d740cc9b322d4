//! Difference of two indicators

use crate::data::{Interval, Timestamp};
use crate::indicators::{
    ensure_same_interval, slots_through, Arrival, IndicatorSeries, SingleIndicator, Update,
    UpdateBarrier,
};
use crate::observable::{Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace, warn};

/// `a[T] - b[T]`, recomputed once per slot after both sources reported it
pub struct DifferenceIndicator {
    series: IndicatorSeries,
    a: Rc<dyn SingleIndicator>,
    b: Rc<dyn SingleIndicator>,
    barrier: UpdateBarrier,
    subscriptions: [SubscriptionId; 2],
}

impl DifferenceIndicator {
    /// Create new difference of `a` and `b`. Both must share an interval.
    pub fn new(
        name: impl Into<String>,
        a: Rc<dyn SingleIndicator>,
        b: Rc<dyn SingleIndicator>,
    ) -> Result<Rc<Self>> {
        ensure_same_interval(a.interval(), b.interval())?;
        let name = name.into();

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let subscribe = |source: &Rc<dyn SingleIndicator>| {
                let weak = weak.clone();
                source.updates().subscribe(move |update: &Update| {
                    if let Some(diff) = weak.upgrade() {
                        diff.on_source_update(update.time);
                    }
                })
            };
            let subscriptions = [subscribe(&a), subscribe(&b)];

            Self {
                series: IndicatorSeries::new(name, a.interval()),
                a,
                b,
                barrier: UpdateBarrier::new(2),
                subscriptions,
            }
        }))
    }

    /// Compute and store the difference for the slot containing `time`
    pub fn calculate(&self, time: Timestamp) -> Result<Decimal> {
        let value = self.a.require(time)? - self.b.require(time)?;
        self.series.store(time, value);
        trace!(indicator = %self.name(), time, %value, "calculated");
        Ok(value)
    }

    /// Source updates counted for the slot currently being tracked
    pub fn pending_updates(&self) -> usize {
        self.barrier.pending()
    }

    fn on_source_update(&self, time: Timestamp) {
        let time = self.interval().floor(time);
        match self.barrier.arrive(time) {
            Arrival::Waiting => return,
            Arrival::Stale => {
                warn!(indicator = %self.name(), time, "ignoring update for an older slot");
                return;
            }
            Arrival::Complete => {}
        }

        let mut value = None;
        for slot in slots_through(self.latest_data(), time, self.interval()) {
            match self.calculate(slot) {
                Ok(v) => value = Some(v),
                Err(e) => {
                    error!(indicator = %self.name(), time = slot, error = %e, "difference update failed");
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
impl SingleIndicator for DifferenceIndicator {
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

        self.a.prep_history(start).await?;
        self.b.prep_history(start).await?;

        let (Some(a_first), Some(b_first), Some(a_last), Some(b_last)) = (
            self.a.earliest_data(),
            self.b.earliest_data(),
            self.a.latest_data(),
            self.b.latest_data(),
        ) else {
            return Ok(());
        };
        let from = start.max(a_first).max(b_first);
        let to = a_last.min(b_last);
        debug!(indicator = %self.name(), from, to, "computing difference history");

        let step = self.interval().millis();
        let mut time = from;
        while time <= to {
            self.calculate(time)?;
            time += step;
        }
        Ok(())
    }
}

impl Drop for DifferenceIndicator {
    fn drop(&mut self) {
        let [a_sub, b_sub] = self.subscriptions;
        self.a.updates().unsubscribe(a_sub);
        self.b.updates().unsubscribe(b_sub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use rust_decimal_macros::dec;
    use std::cell::{Cell, RefCell};

    const MINUTE: i64 = 60_000;

    /// Source whose value at `T` is `T * factor + offset`, reported on demand
    struct FakeSource {
        interval: Interval,
        factor: Decimal,
        offset: Decimal,
        reported: RefCell<Option<(Timestamp, Timestamp)>>,
        prepared: Cell<usize>,
        updates: Publisher<Update>,
    }

    impl FakeSource {
        fn new(factor: Decimal, offset: Decimal) -> Rc<Self> {
            Rc::new(Self {
                interval: Interval::parse("1m").unwrap(),
                factor,
                offset,
                reported: RefCell::new(None),
                prepared: Cell::new(0),
                updates: Publisher::new(),
            })
        }

        fn value(&self, time: Timestamp) -> Decimal {
            Decimal::from(time) * self.factor + self.offset
        }

        fn report(&self, time: Timestamp) {
            let mut reported = self.reported.borrow_mut();
            let first = reported.map_or(time, |(first, _)| first.min(time));
            *reported = Some((first, time));
            drop(reported);
            self.updates.emit(&Update { time, value: self.value(time) });
        }
    }

    #[async_trait(?Send)]
    impl SingleIndicator for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn interval(&self) -> Interval {
            self.interval
        }

        fn get_at(&self, time: Timestamp) -> Option<Decimal> {
            let (first, last) = (*self.reported.borrow())?;
            (first..=last).contains(&time).then(|| self.value(time))
        }

        fn earliest_data(&self) -> Option<Timestamp> {
            self.reported.borrow().map(|(first, _)| first)
        }

        fn latest_data(&self) -> Option<Timestamp> {
            self.reported.borrow().map(|(_, last)| last)
        }

        fn updates(&self) -> &Publisher<Update> {
            &self.updates
        }

        async fn prep_history(&self, start: Timestamp) -> Result<()> {
            self.prepared.set(self.prepared.get() + 1);
            let mut reported = self.reported.borrow_mut();
            let last = reported.map_or(2 * MINUTE, |(_, last)| last);
            *reported = Some((start, last));
            Ok(())
        }
    }

    #[test]
    fn test_calculate() {
        let a = FakeSource::new(dec!(2), dec!(0));
        let b = FakeSource::new(dec!(1), dec!(0));
        let diff = DifferenceIndicator::new("diff", a.clone(), b.clone()).unwrap();
        *a.reported.borrow_mut() = Some((0, 9 * MINUTE));
        *b.reported.borrow_mut() = Some((0, 9 * MINUTE));

        for i in 0..10 {
            let time = i * MINUTE;
            assert_eq!(diff.calculate(time).unwrap(), Decimal::from(time));
        }
        assert_eq!(diff.earliest_data(), Some(0));
        assert_eq!(diff.latest_data(), Some(9 * MINUTE));
        assert_eq!(diff.calculate(10 * MINUTE).unwrap_err().kind(), ErrorKind::DataMissing);
    }

    #[test]
    fn test_recomputes_once_per_slot() {
        let a = FakeSource::new(dec!(1), dec!(1));
        let b = FakeSource::new(dec!(1), dec!(0));
        let diff = DifferenceIndicator::new("diff", a.clone(), b.clone()).unwrap();

        let recomputes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&recomputes);
        diff.updates().subscribe(move |_| counter.set(counter.get() + 1));

        let n = 10;
        for i in 0..n {
            let time = i * MINUTE;
            a.report(time);
            assert_eq!(diff.pending_updates(), 1);
            b.report(time);
            assert_eq!(diff.pending_updates(), 0);
            assert_eq!(diff.latest_data(), Some(time));
        }

        assert_eq!(recomputes.get(), n);
        for i in 0..n {
            assert_eq!(diff.get_at(i * MINUTE), Some(dec!(1)));
        }
    }

    #[tokio::test]
    async fn test_prep_history() {
        let a = FakeSource::new(dec!(1), dec!(1));
        let b = FakeSource::new(dec!(1), dec!(0));
        let diff = DifferenceIndicator::new("diff", a.clone(), b.clone()).unwrap();
        assert!(diff.earliest_data().is_none());

        diff.prep_history(0).await.unwrap();
        assert_eq!(a.prepared.get(), 1);
        assert_eq!(b.prepared.get(), 1);
        assert_eq!(diff.earliest_data(), Some(0));
        assert_eq!(diff.latest_data(), Some(2 * MINUTE));

        // Covered: sources are not asked again.
        diff.prep_history(MINUTE).await.unwrap();
        assert_eq!(a.prepared.get(), 1);
    }

    #[test]
    fn test_interval_mismatch() {
        let a = FakeSource::new(dec!(1), dec!(0));
        let b = Rc::new(FakeSource {
            interval: Interval::parse("5m").unwrap(),
            factor: dec!(1),
            offset: dec!(0),
            reported: RefCell::new(None),
            prepared: Cell::new(0),
            updates: Publisher::new(),
        });

        let result = DifferenceIndicator::new("diff", a, b);
        assert!(matches!(result, Err(Error::IntervalMismatch { .. })));
    }
}
