//! Price history types shared by the data sources and the pipeline

pub mod kraken_api;
pub mod loader;

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Column-oriented OHLCV history for one instrument.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub opens: Array1<f64>,
    pub highs: Array1<f64>,
    pub lows: Array1<f64>,
    pub closes: Array1<f64>, // Close prices for vectorized operations
    pub volumes: Array1<f64>,
    pub symbol: String,
    pub interval: String,
}

impl PriceSeries {
    pub fn from_bars(bars: Vec<PriceBar>, symbol: String, interval: String) -> Self {
        let len = bars.len();
        let mut timestamps = Vec::with_capacity(len);
        let mut opens = Vec::with_capacity(len);
        let mut highs = Vec::with_capacity(len);
        let mut lows = Vec::with_capacity(len);
        let mut closes = Vec::with_capacity(len);
        let mut volumes = Vec::with_capacity(len);

        for bar in bars {
            timestamps.push(bar.timestamp);
            opens.push(bar.open);
            highs.push(bar.high);
            lows.push(bar.low);
            closes.push(bar.close);
            volumes.push(bar.volume);
        }

        Self {
            timestamps,
            opens: Array1::from_vec(opens),
            highs: Array1::from_vec(highs),
            lows: Array1::from_vec(lows),
            closes: Array1::from_vec(closes),
            volumes: Array1::from_vec(volumes),
            symbol,
            interval,
        }
    }

    pub fn bars(&self) -> Vec<PriceBar> {
        (0..self.len())
            .map(|i| PriceBar {
                timestamp: self.timestamps[i],
                open: self.opens[i],
                high: self.highs[i],
                low: self.lows[i],
                close: self.closes[i],
                volume: self.volumes[i],
            })
            .collect()
    }

    /// Drop rows with non-finite values, order by timestamp and keep the
    /// first row of every duplicated timestamp.
    pub fn clean(&self) -> Self {
        let mut bars: Vec<PriceBar> = self.bars().into_iter().filter(PriceBar::is_finite).collect();
        // stable: the first occurrence of a timestamp stays first
        bars.sort_by_key(|bar| bar.timestamp);

        let mut seen = HashSet::with_capacity(bars.len());
        bars.retain(|bar| seen.insert(bar.timestamp));

        Self::from_bars(bars, self.symbol.clone(), self.interval.clone())
    }

    /// Rows `start..` as a new series
    pub fn tail_from(&self, start: usize) -> Self {
        let bars = self.bars().into_iter().skip(start).collect();
        Self::from_bars(bars, self.symbol.clone(), self.interval.clone())
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_clean_removes_duplicates_keeping_first() {
        let series = PriceSeries::from_bars(
            vec![bar(3, 30.0), bar(1, 10.0), bar(3, 99.0), bar(2, 20.0)],
            "TEST".into(),
            "1d".into(),
        );

        let cleaned = series.clean();
        assert_eq!(cleaned.len(), 3);
        assert_eq!(cleaned.closes.to_vec(), vec![10.0, 20.0, 30.0]);
        assert!(cleaned.timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clean_drops_non_finite_rows() {
        let mut broken = bar(2, 20.0);
        broken.volume = f64::NAN;
        let series = PriceSeries::from_bars(vec![bar(1, 10.0), broken, bar(3, 30.0)], "TEST".into(), "1d".into());

        let cleaned = series.clean();
        assert_eq!(cleaned.closes.to_vec(), vec![10.0, 30.0]);
    }

    #[test]
    fn test_tail_from() {
        let series = PriceSeries::from_bars(vec![bar(1, 1.0), bar(2, 2.0), bar(3, 3.0)], "TEST".into(), "1d".into());
        let tail = series.tail_from(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.closes[0], 2.0);
        assert_eq!(tail.symbol, "TEST");
    }
}
