//! Regime segments and per-label run statistics

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::frame::RegimeFrame;
use super::labeler::LabelMap;
use crate::error::{RegimeError, RegimeResult};
use crate::types::{RegimeColor, RegimeLabel};

/// Maximal run of consecutive rows sharing one state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub state: usize,
    pub label: RegimeLabel,
    pub color: RegimeColor,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// One day past `end`, so shaded spans touch the next segment on a chart
    pub end_exclusive: DateTime<Utc>,
    pub start_index: usize,
    pub length: usize,
}

/// (state, first row, row count) for each run of equal adjacent values
pub fn index_runs(states: &[usize]) -> Vec<(usize, usize, usize)> {
    let mut runs: Vec<(usize, usize, usize)> = Vec::new();
    for (i, &state) in states.iter().enumerate() {
        match runs.last_mut() {
            Some((current, _, len)) if *current == state => *len += 1,
            _ => runs.push((state, i, 1)),
        }
    }
    runs
}

pub fn build_segments(frame: &RegimeFrame, labels: &LabelMap) -> RegimeResult<Vec<Segment>> {
    let regimes = frame.regimes()?;

    index_runs(regimes)
        .into_iter()
        .map(|(state, start_index, length)| {
            let entry = labels
                .get(state)
                .ok_or_else(|| RegimeError::Internal(format!("state {} has no label", state)))?;
            let end = frame.timestamps[start_index + length - 1];
            Ok(Segment {
                state,
                label: entry.label,
                color: entry.color,
                start: frame.timestamps[start_index],
                end,
                end_exclusive: end + Duration::days(1),
                start_index,
                length,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Average run length in rows; `None` when the label never occurs
    pub mean_length: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats(BTreeMap<RegimeLabel, LabelStats>);

impl RegimeStats {
    /// Every label gets an entry, including labels with no segments.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut stats = BTreeMap::new();
        for label in RegimeLabel::ASCENDING {
            let lengths: Vec<usize> = segments
                .iter()
                .filter(|s| s.label == label)
                .map(|s| s.length)
                .collect();
            let count = lengths.len();
            let mean_length = if count == 0 {
                None
            } else {
                Some(lengths.iter().sum::<usize>() as f64 / count as f64)
            };
            stats.insert(label, LabelStats { mean_length, count });
        }
        Self(stats)
    }

    pub fn get(&self, label: RegimeLabel) -> Option<&LabelStats> {
        self.0.get(&label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegimeLabel, &LabelStats)> {
        self.0.iter()
    }

    pub fn total_segments(&self) -> usize {
        self.0.values().map(|s| s.count).sum()
    }

    /// Sum of mean length times count, i.e. the number of labelled rows
    pub fn total_rows(&self) -> f64 {
        self.0
            .values()
            .map(|s| s.mean_length.unwrap_or(0.0) * s.count as f64)
            .sum()
    }
}
