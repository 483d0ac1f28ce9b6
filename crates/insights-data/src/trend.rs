//! Trailing moving average over a chronological series.

use crate::aggregator::TimeSeriesPoint;

pub const DEFAULT_TREND_WINDOW: usize = 7;

/// Mean of each trailing `window` of `values`, aligned to the window's last
/// element.
///
/// The first `window - 1` entries are `None`. A zero window, or one longer
/// than the series, yields all `None`.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }
    for (i, w) in values.windows(window).enumerate() {
        out[i + window - 1] = Some(w.iter().sum::<f64>() / window as f64);
    }
    out
}

/// Moving average of the `count` of each point. The series must already be
/// sorted ascending.
pub fn trend(series: &[TimeSeriesPoint], window: usize) -> Vec<Option<f64>> {
    let counts: Vec<f64> = series.iter().map(|p| p.count as f64).collect();
    moving_average(&counts, window)
}
