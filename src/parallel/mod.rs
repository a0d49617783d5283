//! Memory-bounded data-parallel execution over genes
//!
//! Per-gene tasks are pure functions of one gene's coverage matrix, so
//! they may run in any order; results are reassembled in original gene
//! order. A failing task aborts the whole phase.

use ndarray::Array2;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{DegnormError, Result};

/// Per-worker memory budget used to size chunks.
const CHUNK_BYTES: f64 = 1e8;

/// Number of chunks the gene list is split into: at least one chunk per
/// worker, and enough chunks that none holds much more than 100 MB of
/// coverage data.
pub fn chunk_count(total_bytes: usize, n_workers: usize) -> usize {
    let mem_splits = (total_bytes as f64 / CHUNK_BYTES).ceil() as usize;
    mem_splits.max(n_workers).max(1)
}

/// Total payload size of a set of coverage matrices.
pub fn coverage_bytes(mats: &[Array2<f64>]) -> usize {
    mats.iter()
        .map(|m| m.len() * std::mem::size_of::<f64>())
        .sum()
}

/// Contiguous near-equal index ranges covering `0..n`. Empty ranges are
/// elided when there are more chunks than items.
fn chunk_ranges(n: usize, chunks: usize) -> Vec<(usize, usize)> {
    let chunks = chunks.max(1);
    let base = n / chunks;
    let remainder = n % chunks;

    let mut ranges = Vec::with_capacity(chunks);
    let mut start = 0;
    for i in 0..chunks {
        let len = base + usize::from(i < remainder);
        if len == 0 {
            continue;
        }
        ranges.push((start, start + len));
        start += len;
    }
    ranges
}

/// Run `task` over every gene matrix on a worker pool of `n_workers`
/// threads, splitting the gene list into `chunks` contiguous pieces.
///
/// The output vector is indexed by original gene order regardless of
/// completion order. The first task error observed aborts the phase and
/// is returned; no partial results survive.
pub fn dispatch<T, F>(
    mats: &[Array2<f64>],
    chunks: usize,
    n_workers: usize,
    task: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &Array2<f64>) -> Result<T> + Sync,
{
    let ranges = chunk_ranges(mats.len(), chunks);

    let pool = ThreadPoolBuilder::new()
        .num_threads(n_workers.max(1))
        .build()
        .map_err(|e| DegnormError::WorkerPool {
            reason: e.to_string(),
        })?;

    let nested: Vec<Vec<T>> = pool.install(|| {
        ranges
            .into_par_iter()
            .map(|(start, end)| {
                (start..end)
                    .map(|i| task(i, &mats[i]))
                    .collect::<Result<Vec<T>>>()
            })
            .collect::<Result<Vec<Vec<T>>>>()
    })?;

    Ok(nested.into_iter().flatten().collect())
}
