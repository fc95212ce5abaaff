//! Trend analysis over stored samples.

/// Fit a least-squares line through the values (indexed 0..n) and
/// extrapolate one step past the end. Returns `None` when fewer than
/// two points are available or the regression is degenerate.
pub fn predict_next(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denom = n_f * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }

    let slope = (n_f * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n_f;

    Some(slope * n_f + intercept)
}
