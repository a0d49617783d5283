//! Error types for rust_degnorm

use thiserror::Error;

/// Main error type for DegNorm operations
#[derive(Error, Debug)]
pub enum DegnormError {
    #[error("Invalid coverage matrix for gene {gene_id}: {reason}")]
    InvalidCoverageMatrix { gene_id: String, reason: String },

    #[error("Invalid read count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error(
        "Downsample rate {rate} is too large: gene {gene_id} has transcript length {length}"
    )]
    DownsampleRateTooLarge {
        rate: usize,
        gene_id: String,
        length: usize,
    },

    #[error("No genes were eligible for baseline selection; cannot adjust read counts")]
    NoEligibleGenes,

    #[error("Numerical instability for gene {gene_id}: {details}")]
    NumericalInstability { gene_id: String, details: String },

    #[error("Dataset has already been transformed")]
    AlreadyTransformed,

    #[error("Dataset has not been transformed yet; run the DegNorm iteration loop first")]
    NotTransformed,

    #[error("Worker pool construction failed: {reason}")]
    WorkerPool { reason: String },

    #[error("Invalid gene manifest: {reason}")]
    InvalidManifest { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for DegNorm operations
pub type Result<T> = std::result::Result<T, DegnormError>;
