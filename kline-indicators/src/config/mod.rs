//! Configuration module

pub mod indicator;

pub use indicator::*;
