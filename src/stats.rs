//! Shared numeric helpers used across modules

use ndarray::ArrayView2;

/// Median of a slice of finite values.
///
/// Averages the two central order statistics for even-length input.
/// Returns 0.0 for an empty slice; callers validate non-emptiness where
/// it matters.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Frobenius norm of a 2-d view.
pub fn frobenius_norm(x: ArrayView2<f64>) -> f64 {
    x.iter().map(|&v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_median_even() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_frobenius_norm() {
        let x = array![[3.0, 0.0], [0.0, 4.0]];
        assert!((frobenius_norm(x.view()) - 5.0).abs() < 1e-12);
    }
}
