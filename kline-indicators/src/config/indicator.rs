//! Indicator configuration

use crate::error::Error;
use crate::Result;
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Settings shared by every indicator of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Number of intervals of history to backfill on init
    pub ema_history_length: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_history_length: 200,
        }
    }
}

impl IndicatorConfig {
    /// Load from the environment (and `.env`), falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            ema_history_length: parse_history_length(std::env::var("EMA_HISTORY_LENGTH").ok())?,
        })
    }

    /// Use a different history length
    pub fn with_history_length(mut self, ema_history_length: usize) -> Self {
        self.ema_history_length = ema_history_length;
        self
    }
}

fn parse_history_length(raw: Option<String>) -> Result<usize> {
    match raw {
        None => Ok(IndicatorConfig::default().ema_history_length),
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!("EMA_HISTORY_LENGTH must be a whole number, got `{raw}`"))
        }),
    }
}

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdConfig {
    /// Fast EMA period
    pub fast: u32,
    /// Slow EMA period
    pub slow: u32,
    /// Signal line EMA period
    pub signal: u32,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdConfig {
    /// Check the periods are usable
    pub fn validate(&self) -> Result<()> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(Error::InvalidConfig(format!(
                "MACD periods must be non-zero, got {}/{}/{}",
                self.fast, self.slow, self.signal
            )));
        }
        if self.fast >= self.slow {
            return Err(Error::InvalidConfig(format!(
                "MACD fast period ({}) must be shorter than slow period ({})",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

/// Periods of a multi-EMA indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiEmaConfig {
    pub periods: Vec<u32>,
}

impl MultiEmaConfig {
    /// Create new config from a list of periods
    pub fn new(periods: impl Into<Vec<u32>>) -> Self {
        Self {
            periods: periods.into(),
        }
    }

    /// Check the periods are usable: at least one, none zero, no repeats
    pub fn validate(&self) -> Result<()> {
        if self.periods.is_empty() {
            return Err(Error::InvalidConfig("multi-EMA needs at least one period".to_string()));
        }
        if self.periods.contains(&0) {
            return Err(Error::InvalidConfig("EMA period must be non-zero".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.periods.iter().find(|p| !seen.insert(**p)) {
            return Err(Error::InvalidConfig(format!("duplicate EMA period {dup}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_config_defaults() {
        let config = IndicatorConfig::default();
        assert_eq!(config.ema_history_length, 200);
        assert_eq!(config.with_history_length(50).ema_history_length, 50);

        let parsed: IndicatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, IndicatorConfig::default());
    }

    #[test]
    fn test_parse_history_length() {
        assert_eq!(parse_history_length(None).unwrap(), 200);
        assert_eq!(parse_history_length(Some("42".to_string())).unwrap(), 42);
        assert!(matches!(
            parse_history_length(Some("lots".to_string())),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_macd_config_validation() {
        assert!(MacdConfig::default().validate().is_ok());
        assert!(MacdConfig { fast: 26, slow: 12, signal: 9 }.validate().is_err());
        assert!(MacdConfig { fast: 12, slow: 12, signal: 9 }.validate().is_err());
        assert!(MacdConfig { fast: 12, slow: 26, signal: 0 }.validate().is_err());
    }

    #[test]
    fn test_multi_ema_config_validation() {
        assert!(MultiEmaConfig::new([5, 10, 20]).validate().is_ok());
        assert!(MultiEmaConfig::new(Vec::<u32>::new()).validate().is_err());
        assert!(MultiEmaConfig::new([5, 0]).validate().is_err());
        assert!(MultiEmaConfig::new([5, 10, 5]).validate().is_err());
    }
}
