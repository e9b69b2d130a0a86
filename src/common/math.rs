//! Small numeric helpers shared by the indicator and signal layers

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N, not N - 1)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// One EMA step: `(value - previous) * k + previous`
pub fn ema_step(value: f64, previous: f64, k: f64) -> f64 {
    (value - previous) * k + previous
}

/// Smoothing constant for an EMA of `period`
pub fn ema_smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Largest value, `None` for an empty iterator
pub fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

/// Smallest value, `None` for an empty iterator
pub fn min(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |acc, v| match acc {
        Some(m) if m <= v => Some(m),
        _ => Some(v),
    })
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}
