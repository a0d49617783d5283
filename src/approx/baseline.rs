//! Baseline selection
//!
//! Finds a "baseline" subregion of a gene's transcript where degradation
//! appears minimal, so the coverage envelope can be estimated from the
//! least-distorted positions and then extended back over the whole
//! transcript. Regions fitting the rank-one envelope poorly are trimmed
//! one bin at a time until the per-sample DI scores settle or the bin
//! floor is reached.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::approx::rank_one::{outer, over_approximate_factors};
use crate::approx::{clip_di, BinPartition, DI_CONVERGENCE, DI_EPSILON, HIGH_COVERAGE_FRACTION};
use crate::data::DegnormParams;
use crate::error::{DegnormError, Result};
use crate::stats::frobenius_norm;

/// Outcome of one baseline-selection call.
#[derive(Debug, Clone)]
pub struct BaselineFit {
    /// Rank-one envelope over the full transcript, `>=` the input
    /// everywhere. Equals the input exactly when `ran` is false.
    pub estimate: Array2<f64>,
    /// Whether the trimming algorithm actually ran. False marks the gene
    /// ineligible for per-cell read-count adjustment.
    pub ran: bool,
    /// Surviving high-coverage transcript positions (original
    /// coordinates), present only when `ran` is true.
    pub window: Option<Vec<usize>>,
}

impl BaselineFit {
    fn skipped(f: ArrayView2<f64>) -> Self {
        Self {
            estimate: f.to_owned(),
            ran: false,
            window: None,
        }
    }
}

/// Positions whose per-sample maximum depth exceeds
/// [`HIGH_COVERAGE_FRACTION`] of the gene's global maximum depth.
fn high_coverage_positions(f: ArrayView2<f64>) -> Vec<usize> {
    let global_max = f.iter().cloned().fold(0.0_f64, f64::max);
    let threshold = HIGH_COVERAGE_FRACTION * global_max;

    (0..f.ncols())
        .filter(|&j| {
            f.column(j).iter().cloned().fold(0.0_f64, f64::max) > threshold
        })
        .collect()
}

/// Systematic sample of `0..n` with a random start offset below the
/// stride. Callers guarantee `take_every < n`.
fn systematic_sample(n: usize, take_every: usize, rng: &mut StdRng) -> Vec<usize> {
    let start = rng.gen_range(0..take_every);
    (start..n).step_by(take_every).collect()
}

/// Intersection of two sorted, deduplicated index vectors.
fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Per-sample DI scores for a window: `1 - rowSum(F) / (rowSum(est) + c)`
/// clipped into `[0, 1 - DI_EPSILON]`.
fn di_vector(f: &Array2<f64>, estimate: &Array2<f64>, smoothing: f64) -> Array1<f64> {
    let f_sums = f.sum_axis(Axis(1));
    let est_sums = estimate.sum_axis(Axis(1));

    Array1::from_iter(
        f_sums
            .iter()
            .zip(est_sums.iter())
            .map(|(&fs, &es)| clip_di(1.0 - fs / (es + smoothing))),
    )
}

/// `|K ⊗ E|` raised to `f` wherever it under-shoots, keeping the
/// over-approximation invariant inside the trimming loop.
fn envelope(k: &Array1<f64>, e: &Array1<f64>, f: &Array2<f64>) -> Array2<f64> {
    let mut est = outer(k, e).mapv(f64::abs);
    est.zip_mut_with(f, |v, &obs| {
        if *v < obs {
            *v = obs;
        }
    });
    est
}

/// Cheap eligibility predicate used when the routing policy judges genes
/// against their raw coverage: the early-exit criteria of
/// [`select_baseline`], without running the fit. In the downsampled
/// regime roughly every stride-th high-coverage position survives
/// sampling.
pub fn baseline_eligible(f: ArrayView2<f64>, params: &DegnormParams) -> bool {
    if f.axis_iter(Axis(0)).any(|row| row.sum() == 0.0) {
        return false;
    }

    let n_hi_cov = high_coverage_positions(f).len();
    if params.downsample_rate > 1 {
        n_hi_cov / params.downsample_rate > 1
    } else {
        n_hi_cov >= params.min_high_coverage
    }
}

/// Run baseline selection for one gene's coverage matrix.
///
/// Returns the refined full-transcript envelope together with the ran
/// flag and the surviving baseline window. Early exits (any zero sample
/// row, too few high-coverage positions, a degenerate downsample) return
/// the input unchanged with `ran = false`.
///
/// `seed` drives the downsampling start offset only; it is unused when
/// `params.downsample_rate == 1`.
pub fn select_baseline(
    gene_id: &str,
    f: ArrayView2<f64>,
    params: &DegnormParams,
    seed: u64,
) -> Result<BaselineFit> {
    // A sample with no reads anywhere on the transcript gives the
    // envelope a zero scale entry; such genes are routed to the
    // sample-average adjustment branch instead.
    if f.axis_iter(Axis(0)).any(|row| row.sum() == 0.0) {
        return Ok(BaselineFit::skipped(f));
    }

    let mut hi_cov_idx = high_coverage_positions(f);

    if params.downsample_rate > 1 {
        let mut rng = StdRng::seed_from_u64(seed);
        let sampled = systematic_sample(f.ncols(), params.downsample_rate, &mut rng);
        hi_cov_idx = intersect_sorted(&sampled, &hi_cov_idx);
        if hi_cov_idx.len() <= 1 {
            return Ok(BaselineFit::skipped(f));
        }
    } else if hi_cov_idx.len() < params.min_high_coverage {
        return Ok(BaselineFit::skipped(f));
    }

    // Restrict to the high-coverage window; all trimming below selects
    // columns out of this base matrix by original index.
    let f_start = f.select(Axis(1), &hi_cov_idx);

    let mut partition = BinPartition::new(f_start.ncols(), params.bins);
    let min_bins = params.min_bins();

    let mut f_bin = f_start.clone();
    let (mut k, mut e) = over_approximate_factors(f_bin.view(), params.nmf_iter);
    let mut ke_bin = envelope(&k, &e, &f_bin);
    let mut rho = di_vector(&f_bin, &ke_bin, params.di_smoothing);

    // Trim the worst-fitting bin while any sample still scores as
    // degraded. Exits either by convergence (max DI at or below the
    // threshold) or by hitting the bin floor; in both cases the factors
    // correspond to the surviving window because every round refits.
    while partition.len() > min_bins
        && rho.iter().cloned().fold(f64::NEG_INFINITY, f64::max) > DI_CONVERGENCE
    {
        let mut worst_bin = 0;
        let mut worst_ratio = f64::NEG_INFINITY;
        for (idx, range) in partition.compacted_ranges().into_iter().enumerate() {
            let residual = &ke_bin.slice(s![.., range.clone()]) - &f_bin.slice(s![.., range.clone()]);
            let mut ratio = frobenius_norm(residual.view())
                / frobenius_norm(f_bin.slice(s![.., range]));
            if !ratio.is_finite() {
                ratio = 0.0;
            }
            if ratio > worst_ratio {
                worst_ratio = ratio;
                worst_bin = idx;
            }
        }

        partition.drop_bin(worst_bin);

        f_bin = f_start.select(Axis(1), &partition.kept_indices());
        let (k_next, e_next) = over_approximate_factors(f_bin.view(), params.nmf_iter);
        k = k_next;
        e = e_next;
        ke_bin = envelope(&k, &e, &f_bin);
        rho = di_vector(&f_bin, &ke_bin, params.di_smoothing);
    }

    // Floor the envelope scale so the refinement below never divides by
    // zero: entries under DI_EPSILON take the smallest admissible value.
    let floor = k
        .iter()
        .cloned()
        .filter(|&v| v >= DI_EPSILON)
        .fold(f64::INFINITY, f64::min);
    if !floor.is_finite() {
        return Err(DegnormError::NumericalInstability {
            gene_id: gene_id.to_string(),
            details: "all envelope scale factors fell below 1e-5".to_string(),
        });
    }
    k.mapv_inplace(|v| if v < DI_EPSILON { floor } else { v });

    // Extend the envelope back over the full, untrimmed transcript: each
    // position takes the largest per-sample depth-to-scale ratio.
    let mut e_full = Array1::<f64>::zeros(f.ncols());
    for j in 0..f.ncols() {
        let mut max_ratio = f64::NEG_INFINITY;
        for i in 0..f.nrows() {
            let ratio = f[[i, j]] / k[i];
            if ratio > max_ratio {
                max_ratio = ratio;
            }
        }
        if !max_ratio.is_finite() {
            return Err(DegnormError::NumericalInstability {
                gene_id: gene_id.to_string(),
                details: format!("refined envelope is non-finite at position {}", j),
            });
        }
        e_full[j] = max_ratio;
    }

    let mut estimate = outer(&k, &e_full).mapv(f64::abs);
    estimate.zip_mut_with(&f, |v, &obs| {
        if *v < obs {
            *v = obs;
        }
    });

    let window = partition
        .kept_indices()
        .into_iter()
        .map(|i| hi_cov_idx[i])
        .collect();

    Ok(BaselineFit {
        estimate,
        ran: true,
        window: Some(window),
    })
}
