//! Recursive exponential smoothing.
//!
//! EWM[first] = x[first]; EWM[t] = alpha * x[t] + (1 - alpha) * EWM[t-1].
//! No bias correction and no SMA seed: the series is defined from the first
//! finite observation. Leading NaN inputs stay NaN; a NaN input after that
//! repeats the previous smoothed value.

/// Exponentially weighted mean with smoothing factor `alpha`.
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        let next = match (prev, v.is_nan()) {
            (None, true) => continue,
            (None, false) => v,
            (Some(p), true) => p,
            (Some(p), false) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = next;
        prev = Some(next);
    }

    result
}

/// EMA over `span` periods: `ewm` with alpha = 2 / (span + 1).
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm(values, 2.0 / (span as f64 + 1.0))
}
