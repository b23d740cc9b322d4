//! Price stream sources
//!
//! A [`PriceStream`] delivers live `(time, price)` samples for one symbol and
//! interval, and serves historical ranges for backfill. [`ReplayStream`] is an
//! in-memory source fed from stored klines or an mpsc channel.

use crate::data::{Interval, Kline, PriceField, Timestamp};
use crate::observable::{Event, Publisher};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::cell::RefCell;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// A new price for the slot starting at `time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSample {
    pub time: Timestamp,
    pub value: Decimal,
}

impl Event for PriceSample {
    fn name(&self) -> &'static str {
        "newData"
    }
}

/// Source of live and historical prices for one symbol
#[async_trait(?Send)]
pub trait PriceStream {
    /// Trading pair, e.g. "BTCUSDT"
    fn symbol(&self) -> &str;

    /// Sample interval
    fn interval(&self) -> Interval;

    /// Live samples, oldest first
    fn samples(&self) -> &Publisher<PriceSample>;

    /// Historical samples with `start <= time <= end`, oldest first.
    /// Slots may be missing.
    async fn fetch_history_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> anyhow::Result<Vec<(Timestamp, Decimal)>>;
}

/// In-memory price stream over a list of klines
#[derive(Debug)]
pub struct ReplayStream {
    symbol: String,
    interval: Interval,
    field: PriceField,
    klines: RefCell<Vec<Kline>>,
    samples: Publisher<PriceSample>,
}

impl ReplayStream {
    /// Create new stream with no stored klines, publishing close prices
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            field: PriceField::Close,
            klines: RefCell::new(Vec::new()),
            samples: Publisher::new(),
        }
    }

    /// Publish `field` instead of the close price
    pub fn with_field(mut self, field: PriceField) -> Self {
        self.field = field;
        self
    }

    /// Seed stored history without notifying subscribers
    pub fn with_history(self, klines: impl IntoIterator<Item = Kline>) -> Self {
        for kline in klines {
            self.store(kline);
        }
        self
    }

    /// Price field published by this stream
    pub fn field(&self) -> PriceField {
        self.field
    }

    /// Number of stored klines
    pub fn len(&self) -> usize {
        self.klines.borrow().len()
    }

    /// Check if no klines are stored
    pub fn is_empty(&self) -> bool {
        self.klines.borrow().is_empty()
    }

    /// Store `kline` and deliver its price to subscribers
    pub fn feed(&self, kline: Kline) {
        let sample = PriceSample {
            time: kline.open_time,
            value: kline.price(self.field),
        };
        self.store(kline);

        trace!(symbol = %self.symbol, time = sample.time, value = %sample.value, "replay sample");
        self.samples.emit(&sample);
    }

    /// Feed klines from `rx` until every sender is dropped. Returns the
    /// number of klines delivered.
    pub async fn run_channel(&self, mut rx: mpsc::Receiver<Kline>) -> usize {
        let mut delivered = 0;
        while let Some(kline) = rx.recv().await {
            self.feed(kline);
            delivered += 1;
        }
        info!(symbol = %self.symbol, delivered, "kline channel closed");
        delivered
    }

    // Keep klines sorted by open time, replacing a kline for the same slot.
    fn store(&self, kline: Kline) {
        let mut klines = self.klines.borrow_mut();
        match klines.binary_search_by_key(&kline.open_time, |k| k.open_time) {
            Ok(i) => klines[i] = kline,
            Err(i) => klines.insert(i, kline),
        }
    }
}

#[async_trait(?Send)]
impl PriceStream for ReplayStream {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn samples(&self) -> &Publisher<PriceSample> {
        &self.samples
    }

    async fn fetch_history_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> anyhow::Result<Vec<(Timestamp, Decimal)>> {
        let history: Vec<_> = self
            .klines
            .borrow()
            .iter()
            .filter(|k| k.open_time >= start && k.open_time <= end)
            .map(|k| (k.open_time, k.price(self.field)))
            .collect();

        debug!(symbol = %self.symbol, start, end, samples = history.len(), "history range");
        Ok(history)
    }
}
