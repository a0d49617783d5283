//! Contiguous bin bookkeeping for baseline trimming
//!
//! Bins always reference *original* column indices of the matrix they
//! were built over; compacted coordinates for the current shrunken
//! matrix are derived on demand. Dropping a bin therefore never
//! relabels the survivors.

use std::ops::Range;

/// An ordered set of disjoint, contiguous index runs over `[0, n)`.
///
/// Shrinks monotonically as bins are dropped during baseline trimming.
/// The surviving runs collectively cover exactly the kept index set, and
/// no index ever appears in two bins.
#[derive(Debug, Clone)]
pub struct BinPartition {
    bins: Vec<Range<usize>>,
}

impl BinPartition {
    /// Partition `[0, n_positions)` into `n_bins` contiguous bins of
    /// near-equal size (sizes differ by at most one, larger bins first).
    /// When `n_positions < n_bins` the empty tail bins are not created.
    pub fn new(n_positions: usize, n_bins: usize) -> Self {
        let n_bins = n_bins.max(1);
        let base = n_positions / n_bins;
        let remainder = n_positions % n_bins;

        let mut bins = Vec::with_capacity(n_bins);
        let mut start = 0;
        for i in 0..n_bins {
            let len = base + usize::from(i < remainder);
            if len == 0 {
                continue;
            }
            bins.push(start..start + len);
            start += len;
        }

        Self { bins }
    }

    /// Number of surviving bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Total number of surviving positions.
    pub fn n_kept(&self) -> usize {
        self.bins.iter().map(|b| b.len()).sum()
    }

    /// Remove the bin at `idx`. Panics if out of range, mirroring slice
    /// indexing; callers derive `idx` from an enumeration of live bins.
    pub fn drop_bin(&mut self, idx: usize) {
        self.bins.remove(idx);
    }

    /// Sorted union of the surviving original indices.
    pub fn kept_indices(&self) -> Vec<usize> {
        self.bins.iter().flat_map(|b| b.clone()).collect()
    }

    /// Per-bin column ranges in the compacted matrix obtained by
    /// selecting exactly the kept indices, in order. The concatenation
    /// of these ranges is always `[0, n_kept())` with no gaps or
    /// overlaps.
    pub fn compacted_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.bins.len());
        let mut offset = 0;
        for bin in &self.bins {
            ranges.push(offset..offset + bin.len());
            offset += bin.len();
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_equal_partition() {
        let part = BinPartition::new(10, 4);
        assert_eq!(part.len(), 4);

        let sizes: Vec<usize> = part.compacted_ranges().iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        assert_eq!(part.kept_indices(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_fewer_positions_than_bins() {
        let part = BinPartition::new(3, 5);
        assert_eq!(part.len(), 3);
        assert_eq!(part.n_kept(), 3);
    }

    #[test]
    fn test_drop_and_reindex_no_gaps() {
        // Equal-size partition of [0, 20) into 5 bins of 4; dropping any
        // one bin must compact to exactly [0, 16).
        for dropped in 0..5 {
            let mut part = BinPartition::new(20, 5);
            part.drop_bin(dropped);

            let concat: Vec<usize> = part
                .compacted_ranges()
                .into_iter()
                .flatten()
                .collect();
            assert_eq!(concat, (0..16).collect::<Vec<_>>(), "dropped bin {}", dropped);

            // Original indices stay disjoint and sorted.
            let kept = part.kept_indices();
            assert!(kept.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(kept.len(), 16);
        }
    }

    #[test]
    fn test_successive_drops_track_kept_count() {
        let mut part = BinPartition::new(100, 10);
        part.drop_bin(0);
        part.drop_bin(part.len() - 1);
        part.drop_bin(3);
        assert_eq!(part.len(), 7);
        assert_eq!(part.n_kept(), 70);
        assert_eq!(part.kept_indices().len(), 70);

        let concat: Vec<usize> = part.compacted_ranges().into_iter().flatten().collect();
        assert_eq!(concat, (0..70).collect::<Vec<_>>());
    }
}
