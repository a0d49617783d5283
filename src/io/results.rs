//! Results persistence
//!
//! Writes the final DI scores, adjusted read counts and per-chromosome
//! estimated coverage matrices produced by a transformed dataset.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use ndarray::Array2;

use crate::data::DegnormDataSet;
use crate::error::{DegnormError, Result};

/// Chromosome-to-gene map used to group persisted coverage estimates.
#[derive(Debug, Clone)]
pub struct GeneManifest {
    chrom_by_gene: HashMap<String, String>,
}

impl GeneManifest {
    /// Build from `(chromosome, gene)` entries; later duplicates of a
    /// gene are ignored.
    pub fn new(entries: Vec<(String, String)>) -> Self {
        let mut chrom_by_gene = HashMap::with_capacity(entries.len());
        for (chrom, gene) in entries {
            chrom_by_gene.entry(gene).or_insert(chrom);
        }
        Self { chrom_by_gene }
    }

    /// Manifest placing every gene on the same chromosome label.
    pub fn uniform(genes: &[String], chrom: &str) -> Self {
        Self {
            chrom_by_gene: genes
                .iter()
                .map(|g| (g.clone(), chrom.to_string()))
                .collect(),
        }
    }

    pub fn chromosome_of(&self, gene: &str) -> Option<&str> {
        self.chrom_by_gene.get(gene).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.chrom_by_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chrom_by_gene.is_empty()
    }
}

fn matrix_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.outer_iter().map(|row| row.to_vec()).collect()
}

fn write_matrix_csv(
    path: &Path,
    chroms: &[String],
    gene_ids: &[String],
    sample_ids: &[String],
    values: &Array2<f64>,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["chr".to_string(), "gene".to_string()];
    header.extend(sample_ids.iter().cloned());
    writer.write_record(&header)?;

    for (g, gene) in gene_ids.iter().enumerate() {
        let mut record = vec![chroms[g].clone(), gene.clone()];
        for s in 0..values.ncols() {
            record.push(values[[g, s]].to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Persist the outputs of a transformed dataset under `output_dir`:
///
/// - `degradation_index_scores.csv` — final DI matrix,
/// - `adjusted_read_counts.csv` — degradation-corrected counts,
/// - `<chrom>/estimated_coverage_matrices_<chrom>.json` — estimated
///   coverage per gene, grouped by chromosome.
///
/// Genes absent from the manifest are written under the chromosome
/// label `NA` with a warning. `sample_ids` defaults to
/// `sample_1..sample_p` when not supplied.
pub fn write_results(
    dds: &DegnormDataSet,
    manifest: &GeneManifest,
    output_dir: &Path,
    sample_ids: Option<&[String]>,
) -> Result<()> {
    let rho = dds.rho()?;
    let adjusted_counts = dds.adjusted_counts()?;
    let estimates = dds.estimates()?;

    let n_samples = dds.n_samples();
    let sample_ids: Vec<String> = match sample_ids {
        Some(ids) => {
            if ids.len() != n_samples {
                return Err(DegnormError::DimensionMismatch {
                    expected: format!("{} sample IDs", n_samples),
                    got: format!("{}", ids.len()),
                });
            }
            ids.to_vec()
        }
        None => (1..=n_samples).map(|i| format!("sample_{}", i)).collect(),
    };

    let gene_ids = dds.gene_ids();
    let n_known = gene_ids
        .iter()
        .filter(|g| manifest.chromosome_of(g.as_str()).is_some())
        .count();
    if n_known == 0 {
        return Err(DegnormError::InvalidManifest {
            reason: "no processed genes were found in the gene manifest".to_string(),
        });
    }
    if n_known < gene_ids.len() {
        log::warn!(
            "gene manifest covers {} of {} processed genes; the rest are written as chromosome NA",
            n_known,
            gene_ids.len()
        );
    }

    let chroms: Vec<String> = gene_ids
        .iter()
        .map(|g| manifest.chromosome_of(g).unwrap_or("NA").to_string())
        .collect();

    // Nest estimates within chromosomes and write one JSON per
    // chromosome directory.
    let mut by_chrom: BTreeMap<&str, BTreeMap<&str, Vec<Vec<f64>>>> = BTreeMap::new();
    for (g, gene) in gene_ids.iter().enumerate() {
        by_chrom
            .entry(chroms[g].as_str())
            .or_default()
            .insert(gene.as_str(), matrix_rows(&estimates[g]));
    }

    for (chrom, genes) in &by_chrom {
        let chrom_dir = output_dir.join(chrom);
        std::fs::create_dir_all(&chrom_dir)?;
        let path = chrom_dir.join(format!("estimated_coverage_matrices_{}.json", chrom));
        let file = File::create(path)?;
        serde_json::to_writer(file, genes)?;
    }

    write_matrix_csv(
        &output_dir.join("degradation_index_scores.csv"),
        &chroms,
        gene_ids,
        &sample_ids,
        rho,
    )?;
    write_matrix_csv(
        &output_dir.join("adjusted_read_counts.csv"),
        &chroms,
        gene_ids,
        &sample_ids,
        adjusted_counts,
    )?;

    Ok(())
}
