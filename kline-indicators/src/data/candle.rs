//! Kline (OHLCV candle) data structures

use crate::data::Timestamp;
use anyhow::{anyhow, bail, Context};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// One OHLCV candle for a single interval slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Start of the interval slot (ms)
    pub open_time: Timestamp,
    /// Opening price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Base asset volume
    pub volume: Decimal,
}

impl Kline {
    /// Create a new kline
    pub fn new(
        open_time: Timestamp,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Kline with every price equal to `price` and no volume
    pub fn flat(open_time: Timestamp, price: Decimal) -> Self {
        Self::new(open_time, price, price, price, price, Decimal::ZERO)
    }

    /// Parse one row of the exchange REST klines response:
    /// `[openTime, "open", "high", "low", "close", "volume", ...]`
    pub fn from_rest_row(row: &Value) -> anyhow::Result<Self> {
        let fields = row
            .as_array()
            .ok_or_else(|| anyhow!("kline row is not an array: {row}"))?;
        if fields.len() < 6 {
            bail!("kline row has {} fields, expected at least 6", fields.len());
        }

        let open_time = fields[0]
            .as_i64()
            .ok_or_else(|| anyhow!("kline open time is not an integer: {}", fields[0]))?;

        Ok(Self {
            open_time,
            open: decimal_field(&fields[1], "open")?,
            high: decimal_field(&fields[2], "high")?,
            low: decimal_field(&fields[3], "low")?,
            close: decimal_field(&fields[4], "close")?,
            volume: decimal_field(&fields[5], "volume")?,
        })
    }

    /// Parse the payload of a kline stream message (`{"k": {"t": .., "o": "..", ..}}`)
    pub fn from_stream_event(event: &Value) -> anyhow::Result<Self> {
        let k = event
            .get("k")
            .ok_or_else(|| anyhow!("kline event has no `k` object"))?;

        let open_time = k
            .get("t")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("kline event has no open time"))?;

        let field = |key: &str, name: &str| -> anyhow::Result<Decimal> {
            let value = k
                .get(key)
                .ok_or_else(|| anyhow!("kline event has no {name} field"))?;
            decimal_field(value, name)
        };

        Ok(Self {
            open_time,
            open: field("o", "open")?,
            high: field("h", "high")?,
            low: field("l", "low")?,
            close: field("c", "close")?,
            volume: field("v", "volume")?,
        })
    }

    /// Get typical price (HLC/3)
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    /// Get median price (HL/2)
    pub fn median_price(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }

    /// Check if kline is bullish
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if kline is bearish
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Value selected by `field`
    pub fn price(&self, field: PriceField) -> Decimal {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
            PriceField::Typical => self.typical_price(),
            PriceField::Median => self.median_price(),
        }
    }
}

/// Which value of a kline feeds a price series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    Typical,
    Median,
}

/// Parse a full REST klines response. Rows must be oldest first.
pub fn klines_from_rest(body: &Value) -> anyhow::Result<Vec<Kline>> {
    let rows = body
        .as_array()
        .ok_or_else(|| anyhow!("klines response is not an array"))?;

    let mut klines = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let kline = Kline::from_rest_row(row).with_context(|| format!("kline row {i}"))?;
        if let Some(prev) = klines.last().map(|k: &Kline| k.open_time) {
            if kline.open_time < prev {
                bail!("klines not ordered oldest to newest at row {i}");
            }
        }
        klines.push(kline);
    }
    Ok(klines)
}

// Exchanges send prices as strings; accept plain JSON numbers too.
fn decimal_field(value: &Value, name: &str) -> anyhow::Result<Decimal> {
    match value {
        Value::String(s) => {
            Decimal::from_str(s).with_context(|| format!("invalid {name} value `{s}`"))
        }
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .with_context(|| format!("invalid {name} value `{n}`")),
        other => bail!("{name} is not a number: {other}"),
    }
}
