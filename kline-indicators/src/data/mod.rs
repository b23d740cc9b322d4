//! Data management module
//!
//! Interval calendar, gapless time series storage and kline input types.

pub mod candle;
pub mod interval;
pub mod timeseries;

pub use candle::*;
pub use interval::*;
pub use timeseries::*;
