//! Ranks fitted states by return and names them
//!
//! HMM state ids carry no meaning and change between fits. Each state is
//! scored by the average return of the calendar-contiguous runs it occupies,
//! then the three states are mapped, lowest score first, to Bearish, Neutral
//! and Bullish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::frame::RegimeFrame;
use crate::analysis::pct_change;
use crate::error::{RegimeError, RegimeResult};
use crate::types::{RegimeColor, RegimeLabel, REGIME_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateLabel {
    pub state: usize,
    pub label: RegimeLabel,
    pub color: RegimeColor,
    /// Average of per-run mean close-to-close returns
    pub mean_return: f64,
}

/// Bijection from raw state id to label, indexed by state id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    entries: Vec<StateLabel>,
}

impl LabelMap {
    pub fn entries(&self) -> &[StateLabel] {
        &self.entries
    }

    pub fn label_of(&self, state: usize) -> Option<RegimeLabel> {
        self.entries.get(state).map(|e| e.label)
    }

    pub fn state_of(&self, label: RegimeLabel) -> Option<usize> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.state)
    }

    pub fn get(&self, state: usize) -> Option<&StateLabel> {
        self.entries.get(state)
    }
}

/// Indices in `rows` split wherever consecutive timestamps are more than one day apart.
fn calendar_runs(timestamps: &[DateTime<Utc>], rows: &[usize]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;

    for &row in rows {
        let ts = timestamps[row];
        let gap_days = previous.map_or(1, |prev| (ts - prev).num_days());
        match runs.last_mut() {
            Some(run) if gap_days <= 1 => run.push(row),
            _ => runs.push(vec![row]),
        }
        previous = Some(ts);
    }

    runs
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean return of one state over its calendar-contiguous runs of length > 1
pub fn state_mean_return(frame: &RegimeFrame, state: usize) -> RegimeResult<f64> {
    let regimes = frame.regimes()?;
    let rows: Vec<usize> = regimes
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s == state)
        .map(|(i, _)| i)
        .collect();

    let run_means: Vec<f64> = calendar_runs(&frame.timestamps, &rows)
        .into_iter()
        .filter(|run| run.len() > 1)
        .filter_map(|run| {
            let closes: Vec<f64> = run.iter().map(|&i| frame.close[i]).collect();
            mean(&pct_change(&closes))
        })
        .collect();

    Ok(mean(&run_means).unwrap_or(0.0))
}

pub fn label_regimes(frame: &RegimeFrame) -> RegimeResult<LabelMap> {
    frame.smoothed_close()?;
    frame.regimes()?;

    let mean_returns = (0..REGIME_COUNT)
        .map(|state| state_mean_return(frame, state))
        .collect::<RegimeResult<Vec<f64>>>()?;

    // stable sort: equal returns keep state-id order
    let mut order: Vec<usize> = (0..REGIME_COUNT).collect();
    order.sort_by(|&a, &b| {
        mean_returns[a]
            .partial_cmp(&mean_returns[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut entries: Vec<StateLabel> = (0..REGIME_COUNT)
        .map(|state| StateLabel {
            state,
            label: RegimeLabel::Neutral,
            color: RegimeColor::Blue,
            mean_return: mean_returns[state],
        })
        .collect();

    for (rank, &state) in order.iter().enumerate() {
        let label = RegimeLabel::ASCENDING[rank];
        entries[state].label = label;
        entries[state].color = label.color();
    }

    Ok(LabelMap { entries })
}

/// Label of the state on the most recent row
pub fn current_regime(frame: &RegimeFrame, labels: &LabelMap) -> RegimeResult<RegimeLabel> {
    let last = frame
        .regimes()?
        .last()
        .copied()
        .ok_or_else(|| RegimeError::InsufficientData("no decoded states".to_string()))?;

    labels
        .label_of(last)
        .ok_or_else(|| RegimeError::Internal(format!("state {} has no label", last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset)
    }

    /// Frame whose rows (after alignment) have the given days, closes and states
    fn labelled_frame(days: &[i64], closes: &[f64], states: Vec<usize>) -> RegimeFrame {
        let mut timestamps = vec![day(days[0] - 1)];
        timestamps.extend(days.iter().map(|&d| day(d)));
        let mut close = vec![closes[0]];
        close.extend_from_slice(closes);
        let smoothed = close.clone();

        RegimeFrame::new(timestamps, close)
            .unwrap()
            .with_smoothed(smoothed)
            .unwrap()
            .with_regimes(states)
            .unwrap()
    }

    #[test]
    fn test_missing_regime_column() {
        let frame = RegimeFrame::new(vec![day(0)], vec![1.0])
            .unwrap()
            .with_smoothed(vec![1.0])
            .unwrap();
        assert!(matches!(label_regimes(&frame), Err(RegimeError::MissingColumn(_))));
    }

    #[test]
    fn test_missing_smoothed_column() {
        let frame = RegimeFrame::new(vec![day(0), day(1)], vec![1.0, 2.0])
            .unwrap()
            .with_regimes(vec![0])
            .unwrap();
        assert!(matches!(
            label_regimes(&frame),
            Err(RegimeError::MissingColumn(c)) if c == "smoothed_close"
        ));
    }

    #[test]
    fn test_orders_states_by_mean_return() {
        // state 0 rises, state 1 falls, state 2 is flat
        let days: Vec<i64> = (0..9).collect();
        let closes = [100.0, 110.0, 121.0, 121.0, 110.0, 99.0, 99.0, 99.0, 99.0];
        let states = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let frame = labelled_frame(&days, &closes, states);

        let labels = label_regimes(&frame).unwrap();
        assert_eq!(labels.label_of(0), Some(RegimeLabel::Bullish));
        assert_eq!(labels.label_of(1), Some(RegimeLabel::Bearish));
        assert_eq!(labels.label_of(2), Some(RegimeLabel::Neutral));
        assert_eq!(labels.get(1).unwrap().color, RegimeColor::Red);
        assert_eq!(current_regime(&frame, &labels).unwrap(), RegimeLabel::Neutral);
    }

    #[test]
    fn test_ties_keep_state_order() {
        let days: Vec<i64> = (0..6).collect();
        let closes = [50.0; 6];
        let frame = labelled_frame(&days, &closes, vec![2, 2, 1, 1, 0, 0]);

        let labels = label_regimes(&frame).unwrap();
        assert_eq!(labels.label_of(0), Some(RegimeLabel::Bearish));
        assert_eq!(labels.label_of(1), Some(RegimeLabel::Neutral));
        assert_eq!(labels.label_of(2), Some(RegimeLabel::Bullish));
    }

    #[test]
    fn test_calendar_gap_splits_runs() {
        // Two rows of state 0 separated by a weekend: no qualifying run
        let days = [0, 3, 4, 5];
        let closes = [100.0, 200.0, 201.0, 202.0];
        let frame = labelled_frame(&days, &closes, vec![0, 1, 1, 0]);

        // state 0 rows are day 0 and day 5: split by the gap, each run has one row
        assert_eq!(state_mean_return(&frame, 0).unwrap(), 0.0);
        // state 1 rows are days 3 and 4: one run, return 0.5%
        assert!((state_mean_return(&frame, 1).unwrap() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_calendar_runs_split_on_gaps() {
        let timestamps: Vec<_> = [0, 1, 2, 5, 6, 9].iter().map(|&d| day(d)).collect();
        let runs = calendar_runs(&timestamps, &[0, 1, 2, 3, 4, 5]);
        assert_eq!(runs, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_missing_state_scores_zero() {
        let days: Vec<i64> = (0..4).collect();
        let closes = [100.0, 90.0, 80.0, 70.0];
        let frame = labelled_frame(&days, &closes, vec![0, 0, 0, 0]);
        let labels = label_regimes(&frame).unwrap();
        // state 0 falls; absent states 1 and 2 score 0 and keep id order
        assert_eq!(labels.label_of(0), Some(RegimeLabel::Bearish));
        assert_eq!(labels.label_of(1), Some(RegimeLabel::Neutral));
        assert_eq!(labels.label_of(2), Some(RegimeLabel::Bullish));
        assert_eq!(labels.state_of(RegimeLabel::Bullish), Some(2));
    }
}
