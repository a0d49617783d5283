//! Input/output boundary for DegNorm

mod coverage;
mod csv;
mod results;

pub use self::csv::{read_count_matrix, read_gene_manifest};
pub use coverage::read_coverage_set;
pub use results::{write_results, GeneManifest};
