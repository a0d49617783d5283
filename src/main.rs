//! rust_degnorm command-line entry point

use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rust_degnorm::cli::{Cli, Commands};
use rust_degnorm::prelude::*;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            coverage,
            counts,
            manifest,
            output_dir,
            iterations,
            nmf_iterations,
            bins,
            min_bin_ratio,
            min_high_coverage,
            downsample_rate,
            workers,
            smoothing,
            eligibility,
            seed,
        } => {
            let params = DegnormParams {
                degnorm_iter: iterations,
                nmf_iter: nmf_iterations,
                bins,
                min_bin_ratio,
                min_high_coverage,
                downsample_rate,
                n_workers: workers.unwrap_or(DegnormParams::default().n_workers),
                di_smoothing: smoothing,
                eligibility_policy: if eligibility == "raw" {
                    EligibilityPolicy::RawCoverage
                } else {
                    EligibilityPolicy::AdjustedCoverage
                },
                seed,
            };
            run(&coverage, &counts, manifest.as_deref(), &output_dir, params)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(
    coverage_path: &str,
    counts_path: &str,
    manifest_path: Option<&str>,
    output_dir: &str,
    params: DegnormParams,
) -> Result<()> {
    let counts = read_count_matrix(counts_path)?;
    let coverage = read_coverage_set(coverage_path, counts.gene_ids())?;
    let manifest = match manifest_path {
        Some(path) => read_gene_manifest(path)?,
        None => GeneManifest::uniform(counts.gene_ids(), "NA"),
    };

    info!(
        "fitted inputs: {} genes x {} samples",
        counts.n_genes(),
        counts.n_samples()
    );

    let mut dds = DegnormDataSet::new(coverage, counts, params)?;
    run_degnorm(&mut dds)?;

    std::fs::create_dir_all(output_dir)?;
    let sample_ids = dds.sample_ids().to_vec();
    write_results(&dds, &manifest, Path::new(output_dir), Some(&sample_ids))?;
    info!("results written to {}", output_dir);

    Ok(())
}
