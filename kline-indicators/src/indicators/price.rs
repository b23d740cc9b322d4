//! Price indicator: the raw price series of one symbol

use crate::data::{Interval, TimeSeriesData, Timestamp};
use crate::exchange::{PriceSample, PriceStream};
use crate::indicators::{IndicatorContext, IndicatorSeries, SingleIndicator, Update};
use crate::observable::{Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace};

/// Price series fed live by a [`PriceStream`] and backfilled from its history
pub struct PriceIndicator {
    series: IndicatorSeries,
    stream: Rc<dyn PriceStream>,
    context: IndicatorContext,
    subscription: SubscriptionId,
}

impl PriceIndicator {
    /// Create new indicator subscribed to `stream`. No history is fetched.
    pub fn new(stream: Rc<dyn PriceStream>, context: IndicatorContext) -> Rc<Self> {
        let name = format!("{} {} price", stream.symbol(), stream.interval());

        Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = stream.samples().subscribe(move |sample: &PriceSample| {
                if let Some(price) = weak.upgrade() {
                    price.add_sample(sample.time, sample.value);
                }
            });

            Self {
                series: IndicatorSeries::new(name, stream.interval()),
                stream,
                context,
                subscription,
            }
        })
    }

    /// Create new indicator and backfill the configured history length
    pub async fn create_and_init(
        stream: Rc<dyn PriceStream>,
        context: IndicatorContext,
    ) -> Result<Rc<Self>> {
        let price = Self::new(stream, context);
        price.init().await?;
        Ok(price)
    }

    /// Backfill from [`IndicatorContext::history_start`]
    pub async fn init(&self) -> Result<()> {
        let start = self.context.history_start(self.interval());
        info!(indicator = %self.name(), start, "initialising price history");
        self.prep_history(start).await
    }

    /// Store a live sample and notify dependents
    pub fn add_sample(&self, time: Timestamp, value: Decimal) {
        let change = self.series.store(time, value);
        trace!(indicator = %self.name(), time, %value, ?change, "price sample");
        self.series.publish(time, value);
    }

    /// Values stored so far
    pub fn history(&self) -> TimeSeriesData {
        self.series.snapshot()
    }
}

#[async_trait(?Send)]
impl SingleIndicator for PriceIndicator {
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
        let end = self
            .earliest_data()
            .unwrap_or_else(|| self.context.now());
        if end < start {
            return Ok(());
        }

        debug!(indicator = %self.name(), start, end, "fetching price history");
        let samples = self.stream.fetch_history_range(start, end).await?;
        let history = TimeSeriesData::from_samples(self.interval(), samples);
        self.series.merge(&history)
    }
}

impl Drop for PriceIndicator {
    fn drop(&mut self) {
        self.stream.samples().unsubscribe(self.subscription);
    }
}
