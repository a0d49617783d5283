//! Data structures for DegNorm analysis

mod count_matrix;
mod coverage;
mod dataset;
mod params;

pub use count_matrix::ReadCountMatrix;
pub use coverage::{CoverageSet, GeneCoverage};
pub use dataset::{DegnormDataSet, IterationState};
pub use params::{DegnormParams, EligibilityPolicy};
