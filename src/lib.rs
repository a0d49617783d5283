//! rust_degnorm: degradation normalization for RNA-seq data
//!
//! This crate estimates, per gene and per sequencing sample, a
//! degradation index quantifying how much a transcript's observed
//! read-coverage profile has decayed relative to an idealized envelope,
//! and uses that index to produce degradation-corrected read counts and
//! coverage curves.
//!
//! # Example
//!
//! ```ignore
//! use rust_degnorm::prelude::*;
//!
//! // Load data
//! let counts = read_count_matrix("counts.csv")?;
//! let coverage = read_coverage_set("coverage.json", counts.gene_ids())?;
//!
//! // Fit and run the iteration loop
//! let mut dds = DegnormDataSet::new(coverage, counts, DegnormParams::default())?;
//! run_degnorm(&mut dds)?;
//!
//! // Inspect results
//! let rho = dds.rho()?;
//! let adjusted = dds.adjusted_counts()?;
//! ```

pub mod approx;
pub mod cli;
pub mod data;
pub mod error;
pub mod io;
pub mod normalization;
pub mod parallel;
pub mod stats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::approx::{
        baseline_eligible, over_approximate, over_approximate_factors, select_baseline,
        BaselineFit, BinPartition,
    };
    pub use crate::data::{
        CoverageSet, DegnormDataSet, DegnormParams, EligibilityPolicy, GeneCoverage,
        IterationState, ReadCountMatrix,
    };
    pub use crate::error::{DegnormError, Result};
    pub use crate::io::{
        read_count_matrix, read_coverage_set, read_gene_manifest, write_results, GeneManifest,
    };
    pub use crate::normalization::{adjust_coverage, adjust_read_counts, compute_scale_factors};
    pub use crate::{fit_transform, run_degnorm};
}

use indicatif::ProgressBar;

use data::{DegnormDataSet, DegnormParams, EligibilityPolicy, IterationState};
use error::{DegnormError, Result};

/// Initial pass: plain rank-one over-approximation of every gene's raw
/// coverage matrix, followed by the first scale-factor update and
/// coverage/count adjustment. Every gene starts out baseline-eligible.
fn initial_pass(dds: &DegnormDataSet) -> Result<IterationState> {
    let params = dds.params();

    let mut estimates = parallel::dispatch(
        dds.cov_mats(),
        dds.mem_splits(),
        params.n_workers,
        |_, f| Ok(approx::over_approximate(f.view(), params.nmf_iter)),
    )?;

    let (rho, scale_factors) = normalization::compute_scale_factors(
        &estimates,
        dds.cov_sums(),
        dds.counts().counts(),
        params.di_smoothing,
    );

    let adjusted_coverage =
        normalization::adjust_coverage(dds.cov_mats(), &mut estimates, &scale_factors);

    let baseline_eligible = vec![true; dds.n_genes()];
    let adjusted_counts =
        normalization::adjust_read_counts(dds.counts().counts(), &rho, &baseline_eligible)?;

    Ok(IterationState {
        rho,
        scale_factors,
        adjusted_counts,
        adjusted_coverage,
        estimates,
        baseline_eligible,
        baseline_windows: vec![None; dds.n_genes()],
    })
}

/// One refinement round: baseline selection over the current adjusted
/// coverage, eligibility update, scale-factor recomputation, and
/// coverage/count re-adjustment. Consumes the previous state and
/// returns the next one.
fn refinement_pass(dds: &DegnormDataSet, state: IterationState) -> Result<IterationState> {
    let params = dds.params();

    let fits = parallel::dispatch(
        &state.adjusted_coverage,
        dds.mem_splits(),
        params.n_workers,
        |i, f| approx::select_baseline(&dds.gene_ids()[i], f.view(), params, dds.seed_for_gene(i)),
    )?;

    let mut estimates = Vec::with_capacity(fits.len());
    let mut ran_flags = Vec::with_capacity(fits.len());
    let mut baseline_windows = Vec::with_capacity(fits.len());
    for fit in fits {
        estimates.push(fit.estimate);
        ran_flags.push(fit.ran);
        baseline_windows.push(fit.window);
    }

    let baseline_eligible = match params.eligibility_policy {
        EligibilityPolicy::AdjustedCoverage => ran_flags,
        EligibilityPolicy::RawCoverage => dds
            .cov_mats()
            .iter()
            .map(|f| approx::baseline_eligible(f.view(), params))
            .collect(),
    };

    let (rho, scale_factors) = normalization::compute_scale_factors(
        &estimates,
        dds.cov_sums(),
        dds.counts().counts(),
        params.di_smoothing,
    );

    let adjusted_coverage =
        normalization::adjust_coverage(dds.cov_mats(), &mut estimates, &scale_factors);
    let adjusted_counts =
        normalization::adjust_read_counts(dds.counts().counts(), &rho, &baseline_eligible)?;

    Ok(IterationState {
        rho,
        scale_factors,
        adjusted_counts,
        adjusted_coverage,
        estimates,
        baseline_eligible,
        baseline_windows,
    })
}

/// Run the full DegNorm iteration loop on a fitted dataset.
///
/// Executes the initial rank-one pass and then the configured number of
/// baseline-selection refinement rounds; the iteration budget is fixed,
/// with no convergence test. On success the dataset transitions to the
/// transformed state and its result accessors become available.
pub fn run_degnorm(dds: &mut DegnormDataSet) -> Result<()> {
    if dds.is_transformed() {
        return Err(DegnormError::AlreadyTransformed);
    }

    let mut state = initial_pass(dds)?;
    log::info!(
        "initial read count scale factors: {:?}",
        state.scale_factors.to_vec()
    );

    let progress = ProgressBar::new(dds.params().degnorm_iter as u64);
    for round in 0..dds.params().degnorm_iter {
        state = refinement_pass(dds, state)?;
        log::info!(
            "DegNorm iteration {} -- read count scale factors: {:?}",
            round + 1,
            state.scale_factors.to_vec()
        );
        progress.inc(1);
    }
    progress.finish_and_clear();

    dds.set_results(state);
    Ok(())
}

/// Convenience wrapper: build the dataset and run the iteration loop.
pub fn fit_transform(
    coverage: data::CoverageSet,
    counts: data::ReadCountMatrix,
    params: DegnormParams,
) -> Result<DegnormDataSet> {
    let mut dds = DegnormDataSet::new(coverage, counts, params)?;
    run_degnorm(&mut dds)?;
    Ok(dds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::DI_EPSILON;
    use crate::data::{CoverageSet, GeneCoverage, ReadCountMatrix};
    use crate::prelude::*;
    use ndarray::Array2;

    fn scenario_coverage() -> (CoverageSet, ReadCountMatrix) {
        // Gene A: both samples flat at 10 (already rank-one).
        let gene_a = Array2::from_elem((2, 100), 10.0);

        // Gene B: sample 2 has no reads at all.
        let mut gene_b = Array2::from_elem((2, 100), 8.0);
        gene_b.row_mut(1).fill(0.0);

        // Gene C: sample 2 loses ~80% of depth over positions 40..60.
        let mut gene_c = Array2::from_elem((2, 100), 10.0);
        for j in 40..60 {
            gene_c[[1, j]] = 2.0;
        }

        let coverage = CoverageSet::from_records(vec![
            GeneCoverage::new("gene_a", gene_a).unwrap(),
            GeneCoverage::new("gene_b", gene_b).unwrap(),
            GeneCoverage::new("gene_c", gene_c).unwrap(),
        ]);

        let counts = ReadCountMatrix::new(
            ndarray::array![[1000.0, 1000.0], [800.0, 800.0], [1200.0, 1200.0]],
            vec![
                "gene_a".to_string(),
                "gene_b".to_string(),
                "gene_c".to_string(),
            ],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();

        (coverage, counts)
    }

    fn scenario_params() -> DegnormParams {
        DegnormParams {
            degnorm_iter: 2,
            nmf_iter: 20,
            min_high_coverage: 50,
            n_workers: 2,
            seed: Some(1),
            ..DegnormParams::default()
        }
    }

    #[test]
    fn test_initial_pass_fits_rank_one_gene_exactly() {
        let gene_a = Array2::from_elem((2, 100), 10.0);
        let estimate = over_approximate(gene_a.view(), 100);

        for &v in estimate.iter() {
            assert!((v - 10.0).abs() < 1e-6, "estimate {} drifted from 10", v);
        }
    }

    #[test]
    fn test_full_pipeline() {
        let (coverage, counts) = scenario_coverage();
        let dds = fit_transform(coverage, counts, scenario_params()).unwrap();

        assert!(dds.is_transformed());

        // Gene B never runs baseline selection: its second sample row
        // sums to zero in every refinement round.
        let eligible = dds.baseline_eligible().unwrap();
        assert_eq!(eligible, &[true, false, true]);

        // DI scores stay inside [0, 1 - epsilon].
        let rho = dds.rho().unwrap();
        assert_eq!(rho.dim(), (3, 2));
        for &r in rho.iter() {
            assert!((0.0..=1.0 - DI_EPSILON).contains(&r), "rho {} out of bounds", r);
        }

        // The degraded sample scores strictly higher on gene C.
        assert!(
            rho[[2, 1]] > rho[[2, 0]],
            "expected DI for degraded sample ({}) above intact sample ({})",
            rho[[2, 1]],
            rho[[2, 0]]
        );

        // Scale factors are median-centered at 1.
        let sf = dds.scale_factors().unwrap();
        let mut sorted: Vec<f64> = sf.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let med = (sorted[0] + sorted[1]) / 2.0;
        assert!((med - 1.0).abs() < 1e-9);
        assert!(sf.iter().all(|&v| v > 0.0));

        // Adjusted counts exist for every gene and never shrink below
        // the raw counts (divisors are at most 1).
        let adjusted = dds.adjusted_counts().unwrap();
        assert_eq!(adjusted.dim(), (3, 2));
        for (adj, raw) in adjusted.iter().zip(dds.counts().counts().iter()) {
            assert!(*adj >= *raw - 1e-9);
        }

        // Baseline windows exist exactly for the eligible genes.
        let windows = dds.baseline_windows().unwrap();
        assert!(windows[0].is_some());
        assert!(windows[1].is_none());
        assert!(windows[2].is_some());
    }

    #[test]
    fn test_transform_is_terminal() {
        let (coverage, counts) = scenario_coverage();
        let mut dds = fit_transform(coverage, counts, scenario_params()).unwrap();

        let result = run_degnorm(&mut dds);
        assert!(matches!(result, Err(DegnormError::AlreadyTransformed)));
    }

    #[test]
    fn test_parallel_and_serial_pipelines_agree() {
        let (coverage, counts) = scenario_coverage();
        let serial = fit_transform(
            coverage,
            counts,
            DegnormParams {
                n_workers: 1,
                ..scenario_params()
            },
        )
        .unwrap();

        let (coverage, counts) = scenario_coverage();
        let parallel = fit_transform(
            coverage,
            counts,
            DegnormParams {
                n_workers: 4,
                ..scenario_params()
            },
        )
        .unwrap();

        let rho_serial = serial.rho().unwrap();
        let rho_parallel = parallel.rho().unwrap();
        for (a, b) in rho_serial.iter().zip(rho_parallel.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
