//! JSON coverage reader

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;

use crate::data::{CoverageSet, GeneCoverage};
use crate::error::{DegnormError, Result};

/// Read per-gene coverage matrices from a JSON file of the form
/// `{"gene": [[sample-1 depths...], [sample-2 depths...], ...], ...}`
/// and order the records to match `gene_order` (the read-count row
/// order).
pub fn read_coverage_set<P: AsRef<Path>>(path: P, gene_order: &[String]) -> Result<CoverageSet> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut raw: HashMap<String, Vec<Vec<f64>>> = serde_json::from_reader(reader)?;

    let mut set = CoverageSet::new();
    for gene_id in gene_order {
        let rows = raw.remove(gene_id).ok_or_else(|| {
            DegnormError::InvalidCoverageMatrix {
                gene_id: gene_id.clone(),
                reason: "gene not present in coverage file".to_string(),
            }
        })?;
        set.push(rows_to_coverage(gene_id, rows)?);
    }

    if !raw.is_empty() {
        log::warn!(
            "coverage file contains {} genes absent from the read count matrix; ignored",
            raw.len()
        );
    }

    Ok(set)
}

fn rows_to_coverage(gene_id: &str, rows: Vec<Vec<f64>>) -> Result<GeneCoverage> {
    let n_samples = rows.len();
    let n_positions = rows.first().map(|r| r.len()).unwrap_or(0);

    if rows.iter().any(|r| r.len() != n_positions) {
        return Err(DegnormError::InvalidCoverageMatrix {
            gene_id: gene_id.to_string(),
            reason: "sample rows have differing lengths".to_string(),
        });
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let mat = Array2::from_shape_vec((n_samples, n_positions), flat).map_err(|e| {
        DegnormError::InvalidCoverageMatrix {
            gene_id: gene_id.to_string(),
            reason: e.to_string(),
        }
    })?;

    GeneCoverage::new(gene_id, mat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_coverage_in_count_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        let mut f = File::create(&path).unwrap();
        write!(
            f,
            r#"{{"g2": [[1.0, 2.0], [3.0, 4.0]], "g1": [[5.0, 6.0], [7.0, 8.0]]}}"#
        )
        .unwrap();

        let order = vec!["g1".to_string(), "g2".to_string()];
        let set = read_coverage_set(&path, &order).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[0].gene_id(), "g1");
        assert_eq!(set.records()[0].coverage()[[0, 0]], 5.0);
        assert_eq!(set.records()[1].gene_id(), "g2");
    }

    #[test]
    fn test_missing_gene_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        let mut f = File::create(&path).unwrap();
        write!(f, r#"{{"g1": [[1.0]]}}"#).unwrap();

        let order = vec!["g1".to_string(), "g2".to_string()];
        assert!(read_coverage_set(&path, &order).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = rows_to_coverage("g", vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(result.is_err());
    }
}
