//! MACD (Moving Average Convergence Divergence) indicator

use crate::config::MacdConfig;
use crate::data::{Interval, Timestamp};
use crate::indicators::{
    DifferenceIndicator, EmaIndicator, IndicatorContext, MultiIndicator, SingleIndicator, Update,
};
use crate::observable::{Event, Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info};

/// Which way the MACD line crossed the signal line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    /// MACD line moved above the signal line
    Bullish,
    /// MACD line moved below the signal line
    Bearish,
}

/// MACD values for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdValues {
    pub signal: Decimal,
    pub macd: Decimal,
    pub histogram: Decimal,
}

/// Events emitted by [`MacdIndicator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdEvent {
    Update {
        time: Timestamp,
        values: MacdValues,
    },
    Cross {
        time: Timestamp,
        direction: CrossDirection,
        values: MacdValues,
    },
}

impl Event for MacdEvent {
    fn name(&self) -> &'static str {
        match self {
            MacdEvent::Update { .. } => "update",
            MacdEvent::Cross { .. } => "cross",
        }
    }
}

/// MACD over a price source.
///
/// Fixed pipeline: `macd = EMA(fast) - EMA(slow)`, `signal = EMA(signal)`
/// of the MACD line, `histogram = macd - signal`. Recomputed whenever the
/// histogram reports a slot, which happens only after both lines have.
pub struct MacdIndicator {
    source: Rc<dyn SingleIndicator>,
    config: MacdConfig,
    fast: Rc<EmaIndicator>,
    slow: Rc<EmaIndicator>,
    macd: Rc<DifferenceIndicator>,
    signal: Rc<EmaIndicator>,
    histogram: Rc<DifferenceIndicator>,
    /// Sign of `signal - macd` at the last non-zero slot
    last_sign: Cell<Option<Ordering>>,
    events: Publisher<MacdEvent>,
    subscription: SubscriptionId,
}

impl MacdIndicator {
    /// Create new MACD over `source`. No history is computed.
    pub fn new(source: Rc<dyn SingleIndicator>, config: MacdConfig) -> Result<Rc<Self>> {
        config.validate()?;

        let fast = EmaIndicator::new(Rc::clone(&source), config.fast)?;
        let slow = EmaIndicator::new(Rc::clone(&source), config.slow)?;
        let macd = DifferenceIndicator::new(
            format!("MACD({},{})", config.fast, config.slow),
            fast.clone(),
            slow.clone(),
        )?;
        let signal = EmaIndicator::with_name(
            macd.clone(),
            config.signal,
            format!("MACD signal({})", config.signal),
        )?;
        let histogram =
            DifferenceIndicator::new("MACD histogram", macd.clone(), signal.clone())?;

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = histogram.updates().subscribe(move |update: &Update| {
                if let Some(macd) = weak.upgrade() {
                    macd.on_histogram_update(update.time);
                }
            });

            Self {
                source,
                config,
                fast,
                slow,
                macd,
                signal,
                histogram,
                last_sign: Cell::new(None),
                events: Publisher::new(),
                subscription,
            }
        }))
    }

    /// Create new MACD and backfill the configured history length
    pub async fn create_and_init(
        source: Rc<dyn SingleIndicator>,
        config: MacdConfig,
        context: &IndicatorContext,
    ) -> Result<Rc<Self>> {
        let macd = Self::new(source, config)?;
        let start = context.history_start(macd.interval());
        info!(fast = config.fast, slow = config.slow, signal = config.signal, start, "initialising MACD");
        macd.prep_history(start).await?;
        Ok(macd)
    }

    pub fn config(&self) -> MacdConfig {
        self.config
    }

    /// `"update"` and `"cross"` events
    pub fn events(&self) -> &Publisher<MacdEvent> {
        &self.events
    }

    /// MACD line
    pub fn macd_line(&self) -> &Rc<DifferenceIndicator> {
        &self.macd
    }

    /// Signal line
    pub fn signal_line(&self) -> &Rc<EmaIndicator> {
        &self.signal
    }

    pub fn histogram(&self) -> &Rc<DifferenceIndicator> {
        &self.histogram
    }

    /// Fast and slow EMAs
    pub fn emas(&self) -> (&Rc<EmaIndicator>, &Rc<EmaIndicator>) {
        (&self.fast, &self.slow)
    }

    /// All three values at `time`
    pub fn values_at(&self, time: Timestamp) -> Result<MacdValues> {
        Ok(MacdValues {
            signal: self.signal.require(time)?,
            macd: self.macd.require(time)?,
            histogram: self.histogram.require(time)?,
        })
    }

    fn sign(values: &MacdValues) -> Ordering {
        (values.signal - values.macd).cmp(&Decimal::ZERO)
    }

    fn on_histogram_update(&self, time: Timestamp) {
        if let Err(e) = self.calculate(time) {
            error!(time, error = %e, "MACD update failed");
        }
    }

    fn calculate(&self, time: Timestamp) -> Result<()> {
        let values = self.values_at(time)?;

        let sign = Self::sign(&values);
        if sign != Ordering::Equal {
            let previous = self.last_sign.replace(Some(sign));
            if previous.is_some_and(|previous| previous != sign) {
                let direction = if sign == Ordering::Less {
                    CrossDirection::Bullish
                } else {
                    CrossDirection::Bearish
                };
                debug!(time, ?direction, "MACD cross");
                self.events.emit(&MacdEvent::Cross {
                    time,
                    direction,
                    values,
                });
            }
        }

        self.events.emit(&MacdEvent::Update { time, values });
        Ok(())
    }
}

#[async_trait(?Send)]
impl MultiIndicator for MacdIndicator {
    fn interval(&self) -> Interval {
        self.source.interval()
    }

    /// `[signal, macd, histogram]` at `time`
    fn get_all(&self, time: Timestamp) -> Result<Vec<Decimal>> {
        let values = self.values_at(time)?;
        Ok(vec![values.signal, values.macd, values.histogram])
    }

    async fn prep_history(&self, start: Timestamp) -> Result<()> {
        self.histogram.prep_history(start).await?;

        // Seed the sign from the newest non-zero slot so the next live
        // update can report a cross.
        let (Some(first), Some(last)) = (self.histogram.earliest_data(), self.histogram.latest_data())
        else {
            return Ok(());
        };
        let step = self.interval().millis();
        let mut time = last;
        while time >= first {
            if let Ok(values) = self.values_at(time) {
                let sign = Self::sign(&values);
                if sign != Ordering::Equal {
                    self.last_sign.set(Some(sign));
                    break;
                }
            }
            time -= step;
        }
        Ok(())
    }
}

impl Drop for MacdIndicator {
    fn drop(&mut self) {
        self.histogram.updates().unsubscribe(self.subscription);
    }
}
