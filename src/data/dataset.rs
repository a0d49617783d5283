//! Central dataset for a DegNorm run
//!
//! Construction performs every fit-time validation, so a
//! `DegnormDataSet` is always in the fitted state; the iteration loop
//! ([`crate::run_degnorm`]) moves it to transformed, after which the
//! result accessors become available.

use ndarray::{Array1, Array2, Axis};

use super::{CoverageSet, DegnormParams, ReadCountMatrix};
use crate::error::{DegnormError, Result};
use crate::parallel;

/// Accumulated per-iteration state: everything recomputed each round.
///
/// Owned by the iteration loop and threaded through the phase functions
/// as an explicit value; it is stored on the dataset only once the full
/// iteration budget has run.
#[derive(Debug, Clone)]
pub struct IterationState {
    /// Degradation index scores, genes x samples, in `[0, 1 - 1e-5]`.
    pub rho: Array2<f64>,
    /// Per-sample read count scale factors, median-normalized to 1.
    pub scale_factors: Array1<f64>,
    /// Degradation-corrected read counts, genes x samples.
    pub adjusted_counts: Array2<f64>,
    /// Sequencing-depth-adjusted coverage matrices, one per gene.
    pub adjusted_coverage: Vec<Array2<f64>>,
    /// Current envelope estimates, one per gene.
    pub estimates: Vec<Array2<f64>>,
    /// Whether each gene ran baseline selection in the latest pass.
    pub baseline_eligible: Vec<bool>,
    /// Surviving high-coverage positions per baseline-eligible gene.
    pub baseline_windows: Vec<Option<Vec<usize>>>,
}

/// Validated inputs plus (after the iteration loop) final results.
#[derive(Debug, Clone)]
pub struct DegnormDataSet {
    gene_ids: Vec<String>,
    cov_mats: Vec<Array2<f64>>,
    counts: ReadCountMatrix,
    lengths: Vec<usize>,
    /// Raw per-gene, per-sample coverage sums recorded at fit time.
    cov_sums: Array2<f64>,
    mem_splits: usize,
    base_seed: u64,
    params: DegnormParams,
    results: Option<IterationState>,
}

impl DegnormDataSet {
    /// Validate inputs and assemble a fitted dataset.
    ///
    /// Checks that the coverage collection and count matrix agree on
    /// gene count, order and sample count, and that the downsample
    /// stride (when enabled) is below every transcript length. Warns on
    /// coverage matrices with more sample rows than positions.
    pub fn new(
        coverage: CoverageSet,
        counts: ReadCountMatrix,
        params: DegnormParams,
    ) -> Result<Self> {
        if coverage.is_empty() {
            return Err(DegnormError::EmptyData {
                reason: "no coverage matrices supplied".to_string(),
            });
        }

        if coverage.len() != counts.n_genes() {
            return Err(DegnormError::DimensionMismatch {
                expected: format!("{} coverage matrices", counts.n_genes()),
                got: format!("{}", coverage.len()),
            });
        }

        let n_samples = counts.n_samples();
        let mut gene_ids = Vec::with_capacity(coverage.len());
        let mut cov_mats = Vec::with_capacity(coverage.len());

        for (record, expected_id) in coverage.into_records().into_iter().zip(counts.gene_ids()) {
            let (gene_id, mat) = record.into_parts();

            if &gene_id != expected_id {
                return Err(DegnormError::InvalidCoverageMatrix {
                    gene_id,
                    reason: format!(
                        "coverage gene order does not match read count rows (expected {})",
                        expected_id
                    ),
                });
            }
            if mat.nrows() != n_samples {
                return Err(DegnormError::DimensionMismatch {
                    expected: format!("{} sample rows for gene {}", n_samples, gene_id),
                    got: format!("{}", mat.nrows()),
                });
            }

            gene_ids.push(gene_id);
            cov_mats.push(mat);
        }

        let lengths: Vec<usize> = cov_mats.iter().map(|m| m.ncols()).collect();

        let n_wide = lengths.iter().filter(|&&len| len < n_samples).count();
        if n_wide > 0 {
            log::warn!(
                "{} coverage matrices have more sample rows than transcript positions; \
                 check that matrices are samples x positions",
                n_wide
            );
        }

        if params.downsample_rate > 1 {
            if let Some(g) = lengths.iter().position(|&len| len <= params.downsample_rate) {
                return Err(DegnormError::DownsampleRateTooLarge {
                    rate: params.downsample_rate,
                    gene_id: gene_ids[g].clone(),
                    length: lengths[g],
                });
            }
        }

        let mut cov_sums = Array2::<f64>::zeros((cov_mats.len(), n_samples));
        for (g, mat) in cov_mats.iter().enumerate() {
            let sums = mat.sum_axis(Axis(1));
            cov_sums.row_mut(g).assign(&sums);
        }

        let mem_splits =
            parallel::chunk_count(parallel::coverage_bytes(&cov_mats), params.n_workers);
        let base_seed = params.seed.unwrap_or_else(rand::random);

        Ok(Self {
            gene_ids,
            cov_mats,
            counts,
            lengths,
            cov_sums,
            mem_splits,
            base_seed,
            params,
            results: None,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.n_samples()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        self.counts.sample_ids()
    }

    /// Raw (never adjusted) coverage matrices, one per gene.
    pub fn cov_mats(&self) -> &[Array2<f64>] {
        &self.cov_mats
    }

    pub fn counts(&self) -> &ReadCountMatrix {
        &self.counts
    }

    pub fn transcript_lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn cov_sums(&self) -> &Array2<f64> {
        &self.cov_sums
    }

    pub fn params(&self) -> &DegnormParams {
        &self.params
    }

    /// Number of chunks per-gene work is split into (memory-bounded).
    pub fn mem_splits(&self) -> usize {
        self.mem_splits
    }

    /// Deterministic per-gene seed for the downsampling offset.
    pub fn seed_for_gene(&self, gene_idx: usize) -> u64 {
        self.base_seed.wrapping_add(gene_idx as u64)
    }

    pub fn is_transformed(&self) -> bool {
        self.results.is_some()
    }

    pub(crate) fn set_results(&mut self, state: IterationState) {
        self.results = Some(state);
    }

    /// Final iteration state; errors until the loop has run.
    pub fn results(&self) -> Result<&IterationState> {
        self.results.as_ref().ok_or(DegnormError::NotTransformed)
    }

    /// Final DI matrix (genes x samples).
    pub fn rho(&self) -> Result<&Array2<f64>> {
        Ok(&self.results()?.rho)
    }

    /// Final per-sample scale factors.
    pub fn scale_factors(&self) -> Result<&Array1<f64>> {
        Ok(&self.results()?.scale_factors)
    }

    /// Final degradation-corrected read counts.
    pub fn adjusted_counts(&self) -> Result<&Array2<f64>> {
        Ok(&self.results()?.adjusted_counts)
    }

    /// Final envelope estimate per gene.
    pub fn estimates(&self) -> Result<&[Array2<f64>]> {
        Ok(&self.results()?.estimates)
    }

    /// Final baseline-eligibility flag per gene.
    pub fn baseline_eligible(&self) -> Result<&[bool]> {
        Ok(&self.results()?.baseline_eligible)
    }

    /// Final baseline window per gene (original transcript positions).
    pub fn baseline_windows(&self) -> Result<&[Option<Vec<usize>>]> {
        Ok(&self.results()?.baseline_windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeneCoverage;
    use ndarray::array;

    fn coverage_set() -> CoverageSet {
        CoverageSet::from_records(vec![
            GeneCoverage::new("g1", array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap(),
            GeneCoverage::new("g2", array![[2.0, 2.0, 2.0], [1.0, 0.0, 1.0]]).unwrap(),
        ])
    }

    fn count_matrix() -> ReadCountMatrix {
        ReadCountMatrix::new(
            array![[10.0, 20.0], [5.0, 8.0]],
            vec!["g1".to_string(), "g2".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_records_sums_and_lengths() {
        let dds =
            DegnormDataSet::new(coverage_set(), count_matrix(), DegnormParams::default()).unwrap();

        assert_eq!(dds.n_genes(), 2);
        assert_eq!(dds.n_samples(), 2);
        assert_eq!(dds.transcript_lengths(), &[3, 3]);
        assert_eq!(dds.cov_sums()[[0, 0]], 6.0);
        assert_eq!(dds.cov_sums()[[0, 1]], 15.0);
        assert_eq!(dds.cov_sums()[[1, 1]], 2.0);
        assert!(!dds.is_transformed());
    }

    #[test]
    fn test_gene_count_mismatch_rejected() {
        let counts = ReadCountMatrix::new(
            array![[10.0, 20.0]],
            vec!["g1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();

        let result = DegnormDataSet::new(coverage_set(), counts, DegnormParams::default());
        assert!(matches!(result, Err(DegnormError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_gene_order_mismatch_rejected() {
        let counts = ReadCountMatrix::new(
            array![[10.0, 20.0], [5.0, 8.0]],
            vec!["g2".to_string(), "g1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();

        let result = DegnormDataSet::new(coverage_set(), counts, DegnormParams::default());
        assert!(matches!(
            result,
            Err(DegnormError::InvalidCoverageMatrix { .. })
        ));
    }

    #[test]
    fn test_sample_count_mismatch_rejected() {
        let coverage = CoverageSet::from_records(vec![
            GeneCoverage::new("g1", array![[1.0, 2.0, 3.0]]).unwrap(),
            GeneCoverage::new("g2", array![[2.0, 2.0, 2.0]]).unwrap(),
        ]);

        let result = DegnormDataSet::new(coverage, count_matrix(), DegnormParams::default());
        assert!(matches!(result, Err(DegnormError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_downsample_rate_validated_against_lengths() {
        let params = DegnormParams {
            downsample_rate: 5,
            ..DegnormParams::default()
        };
        let result = DegnormDataSet::new(coverage_set(), count_matrix(), params);
        assert!(matches!(
            result,
            Err(DegnormError::DownsampleRateTooLarge { .. })
        ));
    }

    #[test]
    fn test_results_unavailable_before_transform() {
        let dds =
            DegnormDataSet::new(coverage_set(), count_matrix(), DegnormParams::default()).unwrap();
        assert!(matches!(dds.rho(), Err(DegnormError::NotTransformed)));
        assert!(matches!(
            dds.adjusted_counts(),
            Err(DegnormError::NotTransformed)
        ));
    }

    #[test]
    fn test_per_gene_seeds_are_stable() {
        let params = DegnormParams {
            seed: Some(99),
            ..DegnormParams::default()
        };
        let dds = DegnormDataSet::new(coverage_set(), count_matrix(), params).unwrap();
        assert_eq!(dds.seed_for_gene(0), 99);
        assert_eq!(dds.seed_for_gene(1), 100);
    }
}
