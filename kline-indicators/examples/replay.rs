//! Example: replay synthetic klines through a MACD and multi-EMA pipeline

use kline_indicators::prelude::*;
use rust_decimal::Decimal;
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MINUTE: i64 = 60_000;
const HISTORY: usize = 100;
const LIVE: usize = 200;

/// Triangle wave on a slow upward drift
fn create_test_klines(count: usize) -> Vec<Kline> {
    (0..count as i64)
        .map(|i| {
            let swing = (i % 40 - 20).abs();
            let price = Decimal::from(30_000 + i * 2 + swing * 15);
            Kline::new(
                i * MINUTE,
                price,
                price + Decimal::TEN,
                price - Decimal::TEN,
                price,
                Decimal::ONE_HUNDRED,
            )
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut klines = create_test_klines(HISTORY + LIVE);
    let live = klines.split_off(HISTORY);

    let stream = Rc::new(ReplayStream::new("BTCUSDT", Interval::parse("1m")?).with_history(klines));
    let clock = Rc::new(ManualClock::new(HISTORY as i64 * MINUTE));
    let config = IndicatorConfig::from_env()?.with_history_length(HISTORY);
    let context = IndicatorContext::new(clock.clone(), config);

    let price = PriceIndicator::create_and_init(stream.clone(), context.clone()).await?;
    let multi =
        MultiEmaIndicator::create_and_init(price.clone(), &MultiEmaConfig::new([5, 10, 20]), &context)
            .await?;
    let macd = MacdIndicator::create_and_init(price, MacdConfig::default(), &context).await?;
    info!(order = ?multi.ordered_periods(), "history loaded");

    multi.events().on("cross", |event| {
        if let MultiEmaEvent::Cross { time, crossed, price } = event {
            info!(time, ?crossed, %price, "EMA cross");
        }
    });
    multi.events().on("fastSlowCross", |event| {
        if let MultiEmaEvent::FastSlowCross { time, crossed, price } = event {
            info!(time, ?crossed, %price, "EMA fast/slow cross");
        }
    });
    macd.events().on("cross", |event| {
        if let MacdEvent::Cross { time, direction, values } = event {
            info!(time, ?direction, macd = %values.macd, signal = %values.signal, "MACD cross");
        }
    });

    let (tx, rx) = mpsc::channel(16);
    let producer = tokio::spawn(async move {
        for kline in live {
            if tx.send(kline).await.is_err() {
                break;
            }
        }
    });

    let delivered = stream.run_channel(rx).await;
    producer.await?;
    clock.set(stream.len() as i64 * MINUTE);

    let last = (stream.len() as i64 - 1) * MINUTE;
    let values = macd.values_at(last)?;
    info!(
        delivered,
        macd = %values.macd,
        signal = %values.signal,
        histogram = %values.histogram,
        order = ?multi.ordered_periods(),
        "replay finished"
    );

    Ok(())
}
