//! Several EMAs of one source, ranked by value
//!
//! Each time every member has reported a slot, the members are re-ranked
//! (highest value first, shorter period first on ties) and compared with the
//! previous ranking. Members that changed place produce a `"cross"` event,
//! or a `"fastSlowCross"` when the shortest and longest periods are involved.

use crate::config::MultiEmaConfig;
use crate::data::{Interval, Timestamp};
use crate::indicators::{
    find_cross, Arrival, EmaIndicator, IndicatorContext, MultiIndicator, SingleIndicator, Update,
    UpdateBarrier,
};
use crate::observable::{Event, Publisher, SubscriptionId};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Events emitted by [`MultiEmaIndicator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiEmaEvent {
    /// Every member's value for `time`, shortest period first
    Update {
        time: Timestamp,
        values: Vec<(u32, Decimal)>,
    },
    /// Interior members changed places. `crossed` lists their periods in
    /// the new ranking.
    Cross {
        time: Timestamp,
        crossed: Vec<u32>,
        price: Decimal,
    },
    /// The fastest and slowest members changed places
    FastSlowCross {
        time: Timestamp,
        crossed: Vec<u32>,
        price: Decimal,
    },
}

impl Event for MultiEmaEvent {
    fn name(&self) -> &'static str {
        match self {
            MultiEmaEvent::Update { .. } => "update",
            MultiEmaEvent::Cross { .. } => "cross",
            MultiEmaEvent::FastSlowCross { .. } => "fastSlowCross",
        }
    }
}

pub struct MultiEmaIndicator {
    name: String,
    source: Rc<dyn SingleIndicator>,
    emas: Vec<Rc<EmaIndicator>>,
    fast: u32,
    slow: u32,
    ordered: RefCell<Option<Vec<u32>>>,
    barrier: UpdateBarrier,
    events: Publisher<MultiEmaEvent>,
    subscriptions: Vec<SubscriptionId>,
}

impl MultiEmaIndicator {
    /// Create new multi-EMA over `source`. No history is computed.
    pub fn new(source: Rc<dyn SingleIndicator>, config: &MultiEmaConfig) -> Result<Rc<Self>> {
        config.validate()?;

        let mut periods = config.periods.clone();
        periods.sort_unstable();
        let (fast, slow) = (periods[0], periods[periods.len() - 1]);

        let emas = periods
            .iter()
            .map(|&period| EmaIndicator::new(Rc::clone(&source), period))
            .collect::<Result<Vec<_>>>()?;
        let name = format!(
            "MultiEMA({})",
            periods
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let subscriptions = emas
                .iter()
                .map(|ema| {
                    let weak = weak.clone();
                    ema.updates().subscribe(move |update: &Update| {
                        if let Some(multi) = weak.upgrade() {
                            multi.on_member_update(update.time);
                        }
                    })
                })
                .collect();

            Self {
                name,
                source,
                barrier: UpdateBarrier::new(emas.len()),
                emas,
                fast,
                slow,
                ordered: RefCell::new(None),
                events: Publisher::new(),
                subscriptions,
            }
        }))
    }

    /// Create new multi-EMA and backfill the configured history length
    pub async fn create_and_init(
        source: Rc<dyn SingleIndicator>,
        config: &MultiEmaConfig,
        context: &IndicatorContext,
    ) -> Result<Rc<Self>> {
        let multi = Self::new(source, config)?;
        let start = context.history_start(multi.interval());
        info!(indicator = %multi.name, start, "initialising multi-EMA");
        multi.prep_history(start).await?;
        Ok(multi)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member EMAs, shortest period first
    pub fn emas(&self) -> &[Rc<EmaIndicator>] {
        &self.emas
    }

    /// Periods ranked by current value, highest first. `None` until a slot
    /// has been reported by every member.
    pub fn ordered_periods(&self) -> Option<Vec<u32>> {
        self.ordered.borrow().clone()
    }

    /// `"update"`, `"cross"` and `"fastSlowCross"` events
    pub fn events(&self) -> &Publisher<MultiEmaEvent> {
        &self.events
    }

    fn values_at(&self, time: Timestamp) -> Result<Vec<(u32, Decimal)>> {
        self.emas
            .iter()
            .map(|ema| Ok((ema.period(), ema.require(time)?)))
            .collect()
    }

    fn rank(values: &[(u32, Decimal)]) -> Vec<u32> {
        let mut ranked = values.to_vec();
        ranked.sort_by(|(pa, va), (pb, vb)| vb.cmp(va).then(pa.cmp(pb)));
        ranked.into_iter().map(|(period, _)| period).collect()
    }

    fn on_member_update(&self, time: Timestamp) {
        match self.barrier.arrive(time) {
            Arrival::Complete => {
                if let Err(e) = self.recompute(time) {
                    error!(indicator = %self.name, time, error = %e, "multi-EMA update failed");
                }
            }
            Arrival::Stale => warn!(indicator = %self.name, time, "ignoring update for an older slot"),
            Arrival::Waiting => {}
        }
    }

    fn recompute(&self, time: Timestamp) -> Result<()> {
        let values = self.values_at(time)?;
        let price = self.source.require(time)?;
        let order = Self::rank(&values);
        let previous = self.ordered.replace(Some(order.clone()));

        self.events.emit(&MultiEmaEvent::Update { time, values });

        let Some(previous) = previous else {
            return Ok(());
        };
        let cross = find_cross(&previous, &order, &self.fast, &self.slow);
        if !cross.is_cross() {
            return Ok(());
        }

        debug!(indicator = %self.name, time, crossed = ?cross.crossed, fast_slow = cross.fast_slow_cross, "cross");
        let event = if cross.fast_slow_cross {
            MultiEmaEvent::FastSlowCross {
                time,
                crossed: cross.crossed,
                price,
            }
        } else {
            MultiEmaEvent::Cross {
                time,
                crossed: cross.crossed,
                price,
            }
        };
        self.events.emit(&event);
        Ok(())
    }
}

#[async_trait(?Send)]
impl MultiIndicator for MultiEmaIndicator {
    fn interval(&self) -> Interval {
        self.source.interval()
    }

    /// Member values at `time`, shortest period first
    fn get_all(&self, time: Timestamp) -> Result<Vec<Decimal>> {
        Ok(self.values_at(time)?.into_iter().map(|(_, v)| v).collect())
    }

    async fn prep_history(&self, start: Timestamp) -> Result<()> {
        for ema in &self.emas {
            ema.prep_history(start).await?;
        }

        // Rank at the newest slot every member has, without emitting.
        let latest = self.emas.iter().map(|ema| ema.latest_data()).min().flatten();
        if let Some(latest) = latest {
            if let Ok(values) = self.values_at(latest) {
                self.ordered.replace(Some(Self::rank(&values)));
            }
        }
        Ok(())
    }
}

impl Drop for MultiEmaIndicator {
    fn drop(&mut self) {
        for (ema, id) in self.emas.iter().zip(&self.subscriptions) {
            ema.updates().unsubscribe(*id);
        }
    }
}
