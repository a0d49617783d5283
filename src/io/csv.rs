//! CSV readers for count matrices and gene manifests

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use super::results::GeneManifest;
use crate::data::ReadCountMatrix;
use crate::error::{DegnormError, Result};

fn detect_delimiter(line: &str) -> char {
    if line.contains('\t') {
        '\t'
    } else {
        ','
    }
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Read a read count matrix from a CSV/TSV file.
///
/// Expected format: first column gene IDs, header row sample IDs.
/// The delimiter (comma or tab) is auto-detected from the header.
pub fn read_count_matrix<P: AsRef<Path>>(path: P) -> Result<ReadCountMatrix> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines.next().ok_or_else(|| DegnormError::EmptyData {
        reason: "empty count matrix file".to_string(),
    })??;

    let delimiter = detect_delimiter(&header_line);
    let header: Vec<&str> = header_line.split(delimiter).collect();
    if header.len() < 2 {
        return Err(DegnormError::InvalidCountMatrix {
            reason: "count matrix header needs a gene column and at least one sample".to_string(),
        });
    }

    let sample_ids: Vec<String> = header[1..].iter().map(|s| strip_quotes(s)).collect();
    let n_samples = sample_ids.len();

    let mut gene_ids = Vec::new();
    let mut values = Vec::new();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != n_samples + 1 {
            return Err(DegnormError::InvalidCountMatrix {
                reason: format!(
                    "row has {} columns, expected {}",
                    fields.len(),
                    n_samples + 1
                ),
            });
        }

        gene_ids.push(strip_quotes(fields[0]));
        for field in &fields[1..] {
            let value: f64 = field.trim().parse().map_err(|_| {
                DegnormError::InvalidCountMatrix {
                    reason: format!("cannot parse count value '{}'", field),
                }
            })?;
            values.push(value);
        }
    }

    let n_genes = gene_ids.len();
    let counts = Array2::from_shape_vec((n_genes, n_samples), values).map_err(|e| {
        DegnormError::InvalidCountMatrix {
            reason: e.to_string(),
        }
    })?;

    ReadCountMatrix::new(counts, gene_ids, sample_ids)
}

/// Read a gene manifest mapping genes to chromosomes.
///
/// The header must contain `chr` and `gene` columns; any other columns
/// are ignored.
pub fn read_gene_manifest<P: AsRef<Path>>(path: P) -> Result<GeneManifest> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines.next().ok_or_else(|| DegnormError::EmptyData {
        reason: "empty gene manifest file".to_string(),
    })??;

    let delimiter = detect_delimiter(&header_line);
    let header: Vec<String> = header_line
        .split(delimiter)
        .map(strip_quotes)
        .collect();

    let chr_col = header.iter().position(|h| h == "chr").ok_or_else(|| {
        DegnormError::InvalidManifest {
            reason: "manifest is missing a 'chr' column".to_string(),
        }
    })?;
    let gene_col = header.iter().position(|h| h == "gene").ok_or_else(|| {
        DegnormError::InvalidManifest {
            reason: "manifest is missing a 'gene' column".to_string(),
        }
    })?;

    let mut entries = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<String> = line.split(delimiter).map(strip_quotes).collect();
        if fields.len() <= chr_col.max(gene_col) {
            return Err(DegnormError::InvalidManifest {
                reason: format!("manifest row has too few columns: '{}'", line),
            });
        }
        entries.push((fields[chr_col].clone(), fields[gene_col].clone()));
    }

    Ok(GeneManifest::new(entries))
}
