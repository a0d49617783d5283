//! Command-line interface for rust_degnorm

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_degnorm")]
#[command(version)]
#[command(about = "Degradation normalization of RNA-seq coverage and read counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full DegNorm pipeline
    #[command(
        about = "Run the full DegNorm pipeline",
        long_about = "Run the full DegNorm pipeline\n\n\
            Fits rank-one over-approximating envelopes to per-gene coverage\n\
            matrices, iteratively isolates baseline transcript regions, and\n\
            rescales read counts and coverage by the resulting per-sample\n\
            degradation index scores.",
        after_long_help = "\
Examples:
  # Default settings
  rust_degnorm run -c coverage.json -r counts.csv -m manifest.csv -o results/

  # Ten refinement rounds on four workers with a fixed seed
  rust_degnorm run -c coverage.json -r counts.csv -o results/ \\
    --iterations 10 --workers 4 --seed 42

  # Downsample long transcripts, judging eligibility on raw coverage
  rust_degnorm run -c coverage.json -r counts.csv -o results/ \\
    --downsample-rate 10 --eligibility raw"
    )]
    Run {
        /// Path to coverage JSON file
        #[arg(short, long,
            long_help = "Path to coverage JSON file.\n\
                Format: {\"gene\": [[sample 1 depths...], [sample 2 depths...]], ...};\n\
                one samples x positions matrix per gene.")]
        coverage: String,

        /// Path to read count CSV/TSV file
        #[arg(short = 'r', long,
            long_help = "Path to read count CSV/TSV file.\n\
                Format: first column = gene IDs (row order must match the\n\
                coverage file's gene set), header = sample IDs.")]
        counts: String,

        /// Path to gene manifest CSV with `chr` and `gene` columns
        #[arg(short, long,
            long_help = "Path to gene manifest CSV with `chr` and `gene` columns,\n\
                used to group persisted coverage estimates by chromosome.\n\
                When omitted, all output is grouped under chromosome NA.")]
        manifest: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: String,

        /// Number of refinement rounds after the initial pass
        #[arg(long, default_value_t = 5)]
        iterations: usize,

        /// Majorization iterations per rank-one fit
        #[arg(long, default_value_t = 100)]
        nmf_iterations: usize,

        /// Number of bins for baseline trimming
        #[arg(long, default_value_t = 20)]
        bins: usize,

        /// Fraction of bins kept as the trimming floor
        #[arg(long, default_value_t = 0.3)]
        min_bin_ratio: f64,

        /// Minimum number of high-coverage positions per gene
        #[arg(long, default_value_t = 50)]
        min_high_coverage: usize,

        /// Systematic downsampling stride (1 disables downsampling)
        #[arg(long, default_value_t = 1)]
        downsample_rate: usize,

        /// Worker pool size (defaults to available CPUs)
        #[arg(long)]
        workers: Option<usize>,

        /// Smoothing constant added to envelope sums in DI scores
        #[arg(long, default_value_t = 1.0)]
        smoothing: f64,

        /// Judge baseline eligibility on raw or adjusted coverage
        #[arg(long, value_parser = ["raw", "adjusted"], default_value = "adjusted")]
        eligibility: String,

        /// Seed for the downsampling start offset
        #[arg(long)]
        seed: Option<u64>,
    },
}
