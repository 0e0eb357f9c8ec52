//! Rolling averages drawn next to the regime shading

/// Simple moving average; `None` until `window` values have been seen.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                None
            } else {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

/// Index of the first row where every series is defined.
pub fn first_complete_row(columns: &[&[Option<f64>]]) -> Option<usize> {
    let len = columns.iter().map(|c| c.len()).min()?;
    (0..len).find(|&i| columns.iter().all(|c| c[i].is_some()))
}
