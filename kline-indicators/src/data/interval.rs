//! Chart intervals ("1m", "15m", "4h", "1d", "1w")

use crate::error::Error;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

static CHART_INTERVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([mhdwM])$").expect("static regex"));

/// Convert a unit name and multiplier to milliseconds.
///
/// Accepted units: `w`, `d`/`DAY`, `h`, `m`/`MINUTE`, `SECOND`. Months (`M`)
/// are rejected, as is anything else.
pub fn unit_to_millis(unit: &str, multiplier: i64) -> Result<i64> {
    let unit_ms = match unit {
        "M" => return Err(Error::UnsupportedMonthInterval),
        "w" => WEEK_MS,
        "d" | "DAY" => DAY_MS,
        "h" => HOUR_MS,
        "m" | "MINUTE" => MINUTE_MS,
        "SECOND" => SECOND_MS,
        _ => return Err(Error::InvalidInterval(unit.to_string())),
    };

    multiplier
        .checked_mul(unit_ms)
        .ok_or_else(|| Error::InvalidInterval(format!("{multiplier}{unit}")))
}

/// Fixed sample spacing of a time series.
///
/// Every series that is merged or combined with another must share the same
/// interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    millis: i64,
}

impl Interval {
    /// Create an interval of `millis` milliseconds. Must be positive.
    pub fn from_millis(millis: i64) -> Result<Self> {
        if millis <= 0 {
            return Err(Error::InvalidInterval(format!("{millis}ms")));
        }
        Ok(Self { millis })
    }

    /// Parse a chart interval string: digits followed by one of `m`, `h`,
    /// `d`, `w`. `M` (months) is recognised but rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = CHART_INTERVAL
            .captures(s)
            .ok_or_else(|| Error::InvalidInterval(s.to_string()))?;

        let multiplier: i64 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidInterval(s.to_string()))?;
        let millis = unit_to_millis(&caps[2], multiplier)?;

        Self::from_millis(millis).map_err(|_| Error::InvalidInterval(s.to_string()))
    }

    /// Length in milliseconds
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Round `time` down to the start of its interval slot
    pub fn floor(&self, time: Timestamp) -> Timestamp {
        time - time.rem_euclid(self.millis)
    }

    /// Whole intervals from `from` to `to` (both assumed aligned)
    pub(crate) fn steps(&self, from: Timestamp, to: Timestamp) -> i64 {
        (to - from) / self.millis
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.millis;
        if ms % WEEK_MS == 0 {
            write!(f, "{}w", ms / WEEK_MS)
        } else if ms % DAY_MS == 0 {
            write!(f, "{}d", ms / DAY_MS)
        } else if ms % HOUR_MS == 0 {
            write!(f, "{}h", ms / HOUR_MS)
        } else if ms % MINUTE_MS == 0 {
            write!(f, "{}m", ms / MINUTE_MS)
        } else {
            write!(f, "{ms}ms")
        }
    }
}

/// Reads anything [`Display`](fmt::Display) writes: a chart interval, or
/// `<n>ms` for intervals that aren't whole minutes.
impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.strip_suffix("ms") {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                let millis = digits
                    .parse()
                    .map_err(|_| Error::InvalidInterval(s.to_string()))?;
                Self::from_millis(millis)
            }
            _ => Self::parse(s),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}
