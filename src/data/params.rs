//! Configuration for the DegNorm iteration loop

/// Which coverage matrices the baseline-eligibility judgment is made on
/// when routing genes into the read-count adjustment branches.
///
/// `AdjustedCoverage` takes the eligibility flags straight from the
/// baseline-selection pass over the scale-adjusted curves.
/// `RawCoverage` re-evaluates the eligibility criteria against the raw
/// coverage matrices each round instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityPolicy {
    RawCoverage,
    AdjustedCoverage,
}

/// Parameters controlling the DegNorm fit.
#[derive(Debug, Clone)]
pub struct DegnormParams {
    /// Number of refinement rounds to run after the initial pass.
    pub degnorm_iter: usize,
    /// Number of majorization iterations per rank-one over-approximation.
    pub nmf_iter: usize,
    /// Number of contiguous bins used during baseline selection.
    pub bins: usize,
    /// Fraction of `bins` retained as the trimming floor.
    pub min_bin_ratio: f64,
    /// Minimum number of high-coverage positions for a gene to enter
    /// baseline selection (non-downsampled case).
    pub min_high_coverage: usize,
    /// Take-every stride for systematic downsampling; 1 disables it.
    pub downsample_rate: usize,
    /// Worker pool size for per-gene parallel phases.
    pub n_workers: usize,
    /// Smoothing constant added to envelope sums in every DI score.
    pub di_smoothing: f64,
    /// Coverage source for the eligibility judgment.
    pub eligibility_policy: EligibilityPolicy,
    /// Seed for the downsampling start offset; `None` draws one at random.
    pub seed: Option<u64>,
}

impl Default for DegnormParams {
    fn default() -> Self {
        Self {
            degnorm_iter: 5,
            nmf_iter: 100,
            bins: 20,
            min_bin_ratio: 0.3,
            min_high_coverage: 50,
            downsample_rate: 1,
            n_workers: default_workers(),
            di_smoothing: 1.0,
            eligibility_policy: EligibilityPolicy::AdjustedCoverage,
            seed: None,
        }
    }
}

impl DegnormParams {
    /// Minimum number of bins that must survive trimming.
    pub fn min_bins(&self) -> usize {
        (self.bins as f64 * self.min_bin_ratio).ceil() as usize
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_min_bins() {
        let params = DegnormParams::default();
        assert_eq!(params.min_bins(), 6);
    }

    #[test]
    fn test_min_bins_rounds_up() {
        let params = DegnormParams {
            bins: 10,
            min_bin_ratio: 0.25,
            ..DegnormParams::default()
        };
        assert_eq!(params.min_bins(), 3);
    }
}
