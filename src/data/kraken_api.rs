//! Kraken historical OHLC client

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::data::{PriceBar, PriceSeries};

pub const DEFAULT_REST_URL: &str = "https://api.kraken.com";

#[derive(Debug)]
pub struct KrakenHistoricalClient {
    client: reqwest::Client,
    base_url: String,
    warmup_days: i64,
    rate_limiter: RateLimiter,
}

impl KrakenHistoricalClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_REST_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            warmup_days: 200,
            rate_limiter: RateLimiter::new(60, Duration::from_secs(60)), // 60 calls per minute
        }
    }

    /// Calendar days requested before `start` so the long moving average is
    /// defined from `start` onward.
    pub fn with_warmup_days(mut self, days: i64) -> Self {
        self.warmup_days = days;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the OHLC history of `symbol` from `start` (minus warm-up) to now.
    pub async fn fetch_series(
        &mut self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
    ) -> Result<PriceSeries, KrakenApiError> {
        let minutes = interval_minutes(interval)?;
        let since = padded_start(start, self.warmup_days);

        self.rate_limiter.wait_if_needed().await;

        let params = vec![
            ("pair", symbol.to_string()),
            ("interval", minutes.to_string()),
            ("since", since.timestamp().to_string()),
        ];

        let url = format!("{}/0/public/OHLC", self.base_url);
        debug!("Requesting {} {} since {}", symbol, interval, since.format("%Y-%m-%d"));

        let response = self.client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| KrakenApiError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KrakenApiError::HttpError(response.status().as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| KrakenApiError::ParseError(e.to_string()))?;

        let bars = parse_ohlc_response(&json)?;
        debug!("Received {} candles for {}", bars.len(), symbol);

        let missing = check_coverage(&bars, since, start, minutes)?;
        if missing > 0 {
            warn!(
                "⚠️ {} history starts {} days after {}; the first moving averages use a shorter warm-up",
                symbol,
                missing,
                since.format("%Y-%m-%d")
            );
        }

        Ok(PriceSeries::from_bars(bars, symbol.to_string(), interval.to_string()))
    }
}

impl Default for KrakenHistoricalClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Kraken interval in minutes for a chart-style interval string
pub fn interval_minutes(interval: &str) -> Result<u32, KrakenApiError> {
    match interval {
        "1m" => Ok(1),
        "5m" => Ok(5),
        "15m" => Ok(15),
        "30m" => Ok(30),
        "1h" => Ok(60),
        "4h" => Ok(240),
        "1d" => Ok(1440),
        "1wk" => Ok(10080),
        other => Err(KrakenApiError::InvalidInterval(other.to_string())),
    }
}

/// Midnight UTC `warmup_days` calendar days before `start`
pub fn padded_start(start: NaiveDate, warmup_days: i64) -> DateTime<Utc> {
    let adjusted = start - ChronoDuration::days(warmup_days);
    adjusted.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Whole days of warm-up missing before the first bar.
///
/// Kraken serves a bounded number of the most recent candles whatever
/// `since` asks for, so the oldest bar may land after the padded start.
/// A first bar later than `start` itself leaves the requested range
/// uncovered and is an error.
pub fn check_coverage(
    bars: &[PriceBar],
    since: DateTime<Utc>,
    start: NaiveDate,
    interval_minutes: u32,
) -> Result<i64, KrakenApiError> {
    let first = bars
        .first()
        .ok_or_else(|| KrakenApiError::MissingHistory("no candles returned".to_string()))?
        .timestamp;

    let start = padded_start(start, 0);
    if first > start {
        return Err(KrakenApiError::MissingHistory(format!(
            "first candle is {}, after the requested start {}",
            first.format("%Y-%m-%d"),
            start.format("%Y-%m-%d")
        )));
    }

    if first - since > ChronoDuration::minutes(i64::from(interval_minutes)) {
        return Ok((first - since).num_days().max(1));
    }
    Ok(0)
}

fn parse_ohlc_response(json: &Value) -> Result<Vec<PriceBar>, KrakenApiError> {
    if let Some(errors) = json["error"].as_array() {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| e.as_str().unwrap_or_default().to_string())
                .collect();
            return Err(KrakenApiError::ApiError(messages.join(", ")));
        }
    }

    let result = json["result"].as_object()
        .ok_or_else(|| KrakenApiError::ParseError("Missing result field".to_string()))?;

    // `result` holds the pair under Kraken's normalized name next to a `last` cursor
    let pair_data = result.values()
        .find_map(|v| v.as_array())
        .ok_or_else(|| KrakenApiError::ParseError("Invalid OHLC data format".to_string()))?;

    let mut bars = Vec::with_capacity(pair_data.len());

    for candle in pair_data {
        let candle_array = candle.as_array()
            .ok_or_else(|| KrakenApiError::ParseError("Invalid candle format".to_string()))?;

        if candle_array.len() < 7 {
            return Err(KrakenApiError::ParseError(format!(
                "candle has {} fields, expected at least 7",
                candle_array.len()
            )));
        }

        let timestamp = candle_array[0].as_i64()
            .ok_or_else(|| KrakenApiError::ParseError("Invalid timestamp".to_string()))?;
        let timestamp = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| KrakenApiError::ParseError("Invalid timestamp conversion".to_string()))?;

        bars.push(PriceBar {
            timestamp,
            open: parse_price(&candle_array[1], "open")?,
            high: parse_price(&candle_array[2], "high")?,
            low: parse_price(&candle_array[3], "low")?,
            close: parse_price(&candle_array[4], "close")?,
            volume: parse_price(&candle_array[6], "volume")?,
        });
    }

    bars.sort_by_key(|bar| bar.timestamp);

    Ok(bars)
}

fn parse_price(value: &Value, field: &str) -> Result<f64, KrakenApiError> {
    value.as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| KrakenApiError::ParseError(format!("Invalid {} price", field)))
}

#[derive(Debug)]
struct RateLimiter {
    max_calls: u32,
    window_duration: Duration,
    calls: Vec<Instant>,
}

impl RateLimiter {
    fn new(max_calls: u32, window_duration: Duration) -> Self {
        Self {
            max_calls,
            window_duration,
            calls: Vec::new(),
        }
    }

    async fn wait_if_needed(&mut self) {
        let now = Instant::now();

        self.calls.retain(|&call_time| now.duration_since(call_time) <= self.window_duration);

        if self.calls.len() >= self.max_calls as usize {
            if let Some(&oldest_call) = self.calls.first() {
                let wait_time = self.window_duration.saturating_sub(now.duration_since(oldest_call));
                if !wait_time.is_zero() {
                    sleep(wait_time).await;
                }
            }
        }

        self.calls.push(Instant::now());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KrakenApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(u16),

    #[error("Kraken API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported interval: {0}")]
    InvalidInterval(String),

    #[error("Incomplete history: {0}")]
    MissingHistory(String),
}
