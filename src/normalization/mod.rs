//! Scale factor estimation and matrix adjustment
//!
//! Turns per-gene envelope fits into per-sample degradation index scores
//! and read-count scale factors, then applies them to coverage and
//! counts.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::approx::clip_di;
use crate::error::{DegnormError, Result};
use crate::stats::median;

/// Compute the DI matrix and per-sample scale factors from the current
/// envelope estimates.
///
/// `rho[g, s] = 1 - covSum[g, s] / (estSum[g, s] + c)` clipped into
/// `[0, 1 - 1e-5]`, where `covSum` holds the raw per-sample coverage
/// sums recorded at fit time and `c` is the configured smoothing
/// constant. Scale factors are the per-sample column sums of
/// `counts / (1 - rho)` divided by their median, so the returned vector
/// always has median 1.
pub fn compute_scale_factors(
    estimates: &[Array2<f64>],
    cov_sums: &Array2<f64>,
    counts: ArrayView2<f64>,
    smoothing: f64,
) -> (Array2<f64>, Array1<f64>) {
    let (n_genes, n_samples) = cov_sums.dim();

    let mut rho = Array2::<f64>::zeros((n_genes, n_samples));
    for (g, estimate) in estimates.iter().enumerate() {
        let est_sums = estimate.sum_axis(Axis(1));
        for s in 0..n_samples {
            rho[[g, s]] = clip_di(1.0 - cov_sums[[g, s]] / (est_sums[s] + smoothing));
        }
    }

    let mut column_sums = vec![0.0; n_samples];
    for g in 0..n_genes {
        for s in 0..n_samples {
            column_sums[s] += counts[[g, s]] / (1.0 - rho[[g, s]]);
        }
    }

    let center = median(&column_sums);
    let scale_factors = Array1::from_iter(column_sums.into_iter().map(|v| v / center));

    (rho, scale_factors)
}

/// Divide every gene's raw coverage matrix by the per-sample scale
/// factor, and rescale the current estimates to match. Returns the
/// adjusted coverage; estimates are updated in place.
pub fn adjust_coverage(
    cov_mats: &[Array2<f64>],
    estimates: &mut [Array2<f64>],
    scale_factors: &Array1<f64>,
) -> Vec<Array2<f64>> {
    let adjusted = cov_mats
        .iter()
        .map(|f| scale_rows(f, scale_factors))
        .collect();

    for estimate in estimates.iter_mut() {
        for (mut row, &sf) in estimate.outer_iter_mut().zip(scale_factors.iter()) {
            row.mapv_inplace(|v| v / sf);
        }
    }

    adjusted
}

fn scale_rows(f: &Array2<f64>, scale_factors: &Array1<f64>) -> Array2<f64> {
    let mut out = f.clone();
    for (mut row, &sf) in out.outer_iter_mut().zip(scale_factors.iter()) {
        row.mapv_inplace(|v| v / sf);
    }
    out
}

/// Adjust the read count matrix by DI scores.
///
/// Baseline-eligible genes divide each cell by `1 - rho[g, s]`.
/// Ineligible genes divide by `1 - meanRho[s]`, where the mean is taken
/// per sample across the eligible genes only. Errors when no gene is
/// eligible, since the fallback divisor is then undefined.
pub fn adjust_read_counts(
    counts: ArrayView2<f64>,
    rho: &Array2<f64>,
    eligible: &[bool],
) -> Result<Array2<f64>> {
    let (n_genes, n_samples) = counts.dim();
    let mut adjusted = counts.to_owned();

    let n_eligible = eligible.iter().filter(|&&e| e).count();
    if n_eligible == 0 {
        return Err(DegnormError::NoEligibleGenes);
    }

    let mut mean_rho = vec![0.0; n_samples];
    for (g, &is_eligible) in eligible.iter().enumerate() {
        if is_eligible {
            for s in 0..n_samples {
                mean_rho[s] += rho[[g, s]];
            }
        }
    }
    for v in mean_rho.iter_mut() {
        *v /= n_eligible as f64;
    }

    for (g, &is_eligible) in eligible.iter().enumerate() {
        for s in 0..n_samples {
            let divisor = if is_eligible {
                1.0 - rho[[g, s]]
            } else {
                1.0 - mean_rho[s]
            };
            adjusted[[g, s]] = counts[[g, s]] / divisor;
        }
    }

    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::DI_EPSILON;
    use ndarray::array;

    #[test]
    fn test_scale_factor_median_is_one() {
        let estimates = vec![
            array![[20.0, 20.0, 20.0], [10.0, 10.0, 10.0]],
            array![[8.0, 8.0, 8.0], [16.0, 16.0, 16.0]],
        ];
        let cov_sums = array![[50.0, 25.0], [20.0, 40.0]];
        let counts = array![[100.0, 50.0], [40.0, 80.0]];

        let (rho, sf) = compute_scale_factors(&estimates, &cov_sums, counts.view(), 1.0);

        assert_eq!(rho.dim(), (2, 2));
        let mut sorted: Vec<f64> = sf.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let med = (sorted[0] + sorted[1]) / 2.0;
        assert!((med - 1.0).abs() < 1e-12);
        assert!(sf.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_di_scores_are_clipped() {
        // First gene: estimate sums far below coverage sums would push
        // rho negative; second gene: zero coverage pushes rho toward 1.
        let estimates = vec![array![[1.0, 1.0]], array![[500.0, 500.0]]];
        let cov_sums = array![[100.0], [0.0]];
        let counts = array![[10.0], [10.0]];

        let (rho, _) = compute_scale_factors(&estimates, &cov_sums, counts.view(), 1.0);

        for &r in rho.iter() {
            assert!((0.0..=1.0 - DI_EPSILON).contains(&r), "rho {} out of bounds", r);
        }
        assert_eq!(rho[[0, 0]], 0.0);
    }

    #[test]
    fn test_adjust_coverage_divides_rows() {
        let cov = vec![array![[2.0, 4.0], [9.0, 3.0]]];
        let mut estimates = vec![array![[4.0, 4.0], [9.0, 9.0]]];
        let sf = array![2.0, 3.0];

        let adjusted = adjust_coverage(&cov, &mut estimates, &sf);

        assert_eq!(adjusted[0], array![[1.0, 2.0], [3.0, 1.0]]);
        assert_eq!(estimates[0], array![[2.0, 2.0], [3.0, 3.0]]);
        // Raw input untouched.
        assert_eq!(cov[0], array![[2.0, 4.0], [9.0, 3.0]]);
    }

    #[test]
    fn test_adjust_read_counts_branches() {
        let counts = array![[10.0, 10.0], [10.0, 10.0]];
        let rho = array![[0.5, 0.0], [0.9, 0.9]];
        let eligible = vec![true, false];

        let adjusted = adjust_read_counts(counts.view(), &rho, &eligible).unwrap();

        // Eligible gene: per-cell divisor.
        assert!((adjusted[[0, 0]] - 20.0).abs() < 1e-12);
        assert!((adjusted[[0, 1]] - 10.0).abs() < 1e-12);
        // Ineligible gene: mean rho over eligible genes is (0.5, 0.0).
        assert!((adjusted[[1, 0]] - 20.0).abs() < 1e-12);
        assert!((adjusted[[1, 1]] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_adjust_read_counts_requires_eligible_gene() {
        let counts = array![[10.0]];
        let rho = array![[0.5]];
        let result = adjust_read_counts(counts.view(), &rho, &[false]);
        assert!(matches!(result, Err(DegnormError::NoEligibleGenes)));
    }
}
