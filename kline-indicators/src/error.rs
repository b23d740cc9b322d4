//! Error types shared by every module of the crate

use crate::data::{Interval, Timestamp};
use thiserror::Error;

/// Broad class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad interval string, mismatched intervals, invalid parameters.
    /// Fatal where it happens, never retried.
    Configuration,
    /// An indicator was asked for a value it does not hold.
    DataMissing,
    /// A collaborator (history fetch, stream) failed.
    Upstream,
}

/// Indicator pipeline error
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{0}` is not a valid interval string")]
    InvalidInterval(String),

    #[error("months aren't supported as an interval, their length varies")]
    UnsupportedMonthInterval,

    #[error("interval mismatch: expected {expected}, found {found}")]
    IntervalMismatch { expected: Interval, found: Interval },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{indicator}: data missing at {time}")]
    DataMissing { indicator: String, time: Timestamp },

    #[error("upstream data error: {0}")]
    Upstream(#[from] anyhow::Error),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInterval(_)
            | Self::UnsupportedMonthInterval
            | Self::IntervalMismatch { .. }
            | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::DataMissing { .. } => ErrorKind::DataMissing,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    pub(crate) fn data_missing(indicator: &str, time: Timestamp) -> Self {
        Self::DataMissing {
            indicator: indicator.to_string(),
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::InvalidInterval("1x".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::UnsupportedMonthInterval.kind(), ErrorKind::Configuration);
        assert_eq!(Error::data_missing("EMA(9)", 60_000).kind(), ErrorKind::DataMissing);
        assert_eq!(
            Error::from(anyhow::anyhow!("connection reset")).kind(),
            ErrorKind::Upstream
        );
    }

    #[test]
    fn test_error_messages() {
        let err = Error::data_missing("EMA(9)", 60_000);
        assert_eq!(err.to_string(), "EMA(9): data missing at 60000");

        let err = Error::IntervalMismatch {
            expected: Interval::from_millis(60_000).unwrap(),
            found: Interval::from_millis(3_600_000).unwrap(),
        };
        assert_eq!(err.to_string(), "interval mismatch: expected 1m, found 1h");
    }
}
