//! Candle and snapshot types

use super::FetchError;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of leading upstream fields kept per record
pub const CANDLE_FIELDS: usize = 5;

/// One OHLC record truncated to `[open_time, open, high, low, close]`
///
/// Prices stay as text so no precision is lost between upstream and clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    /// Open time (epoch milliseconds)
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl Candle {
    /// Build a candle from one upstream kline record
    ///
    /// Only the first five elements are read; volume, close time and the rest
    /// are discarded.
    pub fn from_upstream(record: &[Value]) -> Result<Self, FetchError> {
        if record.len() < CANDLE_FIELDS {
            return Err(FetchError::Parse(format!(
                "Expected at least {} fields, got {}",
                CANDLE_FIELDS,
                record.len()
            )));
        }

        let open_time = record[0].as_i64().ok_or_else(|| {
            FetchError::Parse(format!("Open time is not an integer: {}", record[0]))
        })?;

        Ok(Self {
            open_time,
            open: price_text(&record[1], "open")?,
            high: price_text(&record[2], "high")?,
            low: price_text(&record[3], "low")?,
            close: price_text(&record[4], "close")?,
        })
    }

    /// Open time as a UTC timestamp
    pub fn open_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.open_time).single()
    }
}

/// Upstream sends prices as strings; bare numbers are accepted and kept as their text
fn price_text(value: &Value, field: &str) -> Result<String, FetchError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(FetchError::Parse(format!(
            "Field {} is not a price: {}",
            field, other
        ))),
    }
}

impl Serialize for Candle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(CANDLE_FIELDS)?;
        tuple.serialize_element(&self.open_time)?;
        tuple.serialize_element(&self.open)?;
        tuple.serialize_element(&self.high)?;
        tuple.serialize_element(&self.low)?;
        tuple.serialize_element(&self.close)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Candle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (open_time, open, high, low, close) =
            <(i64, String, String, String, String)>::deserialize(deserializer)?;
        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
        })
    }
}

/// The candles from the most recent successful fetch, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    candles: Vec<Candle>,
}

impl Snapshot {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Parse a raw upstream klines response body
    ///
    /// Any malformed record rejects the whole body; a partial snapshot is
    /// never produced.
    pub fn from_upstream_json(body: &[u8]) -> Result<Self, FetchError> {
        let records: Vec<Vec<Value>> = serde_json::from_slice(body)?;

        let candles = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                Candle::from_upstream(record).map_err(|e| match e {
                    FetchError::Parse(msg) => FetchError::Parse(format!("record {}: {}", idx, msg)),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Most recent candle
    pub fn newest(&self) -> Option<&Candle> {
        self.candles.last()
    }
}
