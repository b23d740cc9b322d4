//! Kline-Indicators: incremental technical indicators over exchange klines
//!
//! This crate turns a stream of candle prices into gapless, interval-aligned
//! time series and derives indicators from them as each sample arrives:
//!
//! - **Data**: interval calendar, gapless [`TimeSeriesData`](data::TimeSeriesData), klines
//! - **Indicators**: price, EMA, difference, RSI, multi-EMA ranking, MACD
//! - **Signals**: `"cross"`/`"fastSlowCross"` events from multi-EMA and MACD
//! - **Backfill**: every indicator can fetch and compute its own history
//!
//! All arithmetic uses [`rust_decimal::Decimal`]. An indicator graph is
//! single-threaded: indicators are shared as `Rc` and talk through
//! synchronous [`Publisher`](observable::Publisher) events.
//!
//! # Example
//!
//! ```no_run
//! use kline_indicators::prelude::*;
//! use std::rc::Rc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let interval = Interval::parse("1m")?;
//!     let stream = Rc::new(ReplayStream::new("BTCUSDT", interval));
//!     let context = IndicatorContext::system();
//!
//!     let price = PriceIndicator::create_and_init(stream.clone(), context.clone()).await?;
//!     let macd = MacdIndicator::create_and_init(price, MacdConfig::default(), &context).await?;
//!     macd.events().on("cross", |event| println!("{event:?}"));
//!
//!     stream.feed(Kline::flat(0, rust_decimal::Decimal::ONE_HUNDRED));
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod observable;

pub use error::{Error, ErrorKind};

// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::exchange::*;
    pub use crate::indicators::*;
    pub use crate::observable::*;

    pub use crate::Result;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
