//! Exchange integration module
//!
//! Price stream abstraction consumed by the price indicators, plus an
//! in-memory replay source.

pub mod streaming;

pub use streaming::*;
