//! Load price history saved as JSON

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::data::{PriceBar, PriceSeries};
use crate::error::{RegimeError, RegimeResult};

/// One row of a saved series. `date` is either `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Deserialize)]
struct BarRecord {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Read a JSON array of OHLCV rows into a series.
pub fn load_series<P: AsRef<Path>>(path: P, symbol: &str, interval: &str) -> RegimeResult<PriceSeries> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| RegimeError::FileRead(format!("{}: {}", path.display(), e)))?;
    parse_series(&content, symbol, interval)
}

pub fn parse_series(content: &str, symbol: &str, interval: &str) -> RegimeResult<PriceSeries> {
    let records: Vec<BarRecord> = serde_json::from_str(content)?;

    let bars = records
        .into_iter()
        .map(|record| {
            Ok(PriceBar {
                timestamp: parse_timestamp(&record.date)?,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            })
        })
        .collect::<RegimeResult<Vec<_>>>()?;

    Ok(PriceSeries::from_bars(bars, symbol.to_string(), interval.to_string()))
}

pub fn parse_timestamp(raw: &str) -> RegimeResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RegimeError::DataParse(format!("Invalid date '{}'", raw)))
}
