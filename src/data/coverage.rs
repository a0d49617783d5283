//! Per-gene coverage matrices

use ndarray::{Array2, ArrayView2};

use crate::error::{DegnormError, Result};

/// Per-base read coverage for a single gene.
///
/// Rows are samples, columns are transcript positions. Values are
/// non-negative per-base sequencing depths produced by an upstream
/// exon-slicing step.
#[derive(Debug, Clone)]
pub struct GeneCoverage {
    gene_id: String,
    coverage: Array2<f64>,
}

impl GeneCoverage {
    /// Create a validated coverage record.
    pub fn new(gene_id: impl Into<String>, coverage: Array2<f64>) -> Result<Self> {
        let gene_id = gene_id.into();

        let (n_samples, n_positions) = coverage.dim();
        if n_samples == 0 || n_positions == 0 {
            return Err(DegnormError::InvalidCoverageMatrix {
                gene_id,
                reason: "coverage matrix has a zero dimension".to_string(),
            });
        }

        if coverage.iter().any(|&v| v < 0.0 || !v.is_finite()) {
            return Err(DegnormError::InvalidCoverageMatrix {
                gene_id,
                reason: "coverage values must be non-negative finite numbers".to_string(),
            });
        }

        Ok(Self { gene_id, coverage })
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    pub fn coverage(&self) -> ArrayView2<'_, f64> {
        self.coverage.view()
    }

    /// Transcript length (number of positions).
    pub fn length(&self) -> usize {
        self.coverage.ncols()
    }

    pub fn n_samples(&self) -> usize {
        self.coverage.nrows()
    }

    pub(crate) fn into_parts(self) -> (String, Array2<f64>) {
        (self.gene_id, self.coverage)
    }
}

/// Ordered collection of per-gene coverage records.
///
/// Iteration order is the gene-order contract shared with the read count
/// matrix: the i-th record corresponds to the i-th count row.
#[derive(Debug, Clone, Default)]
pub struct CoverageSet {
    records: Vec<GeneCoverage>,
}

impl CoverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<GeneCoverage>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: GeneCoverage) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneCoverage> {
        self.records.iter()
    }

    pub fn records(&self) -> &[GeneCoverage] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<GeneCoverage> {
        self.records
    }
}
