//! Batch partitioning.
//!
//! RULE: batches are contiguous, non-overlapping, and their counts sum to
//! exactly the requested total. Every generator and loader relies on this.

use crate::error::{SeedError, SeedResult};
use serde::{Deserialize, Serialize};

/// One independently generatable slice of a stage's target row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Position in the partition, starting at 0.
    pub index: usize,
    /// Global offset of the first row.
    pub start: usize,
    pub count: usize,
}

impl Batch {
    /// One past the last global offset.
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn offsets(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Split `total` rows into ceil(total / batch_size) batches, the last one
/// truncated to the remainder. `total == 0` yields no batches.
pub fn partition(total: usize, batch_size: usize) -> SeedResult<Vec<Batch>> {
    if batch_size == 0 {
        return Err(SeedError::config("batch size must be greater than zero"));
    }
    Ok((0..total.div_ceil(batch_size))
        .map(|index| {
            let start = index * batch_size;
            Batch {
                index,
                start,
                count: batch_size.min(total - start),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple() {
        let batches = partition(30, 10).unwrap();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.count == 10));
        assert_eq!(batches[2].start, 20);
    }

    #[test]
    fn remainder_goes_to_last_batch() {
        let batches = partition(25, 10).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], Batch { index: 2, start: 20, count: 5 });
    }

    #[test]
    fn total_smaller_than_batch() {
        let batches = partition(3, 10_000).unwrap();
        assert_eq!(batches, vec![Batch { index: 0, start: 0, count: 3 }]);
    }

    #[test]
    fn zero_total_is_empty() {
        assert!(partition(0, 10).unwrap().is_empty());
    }

    #[test]
    fn zero_batch_size_is_a_configuration_error() {
        assert!(matches!(partition(10, 0), Err(SeedError::Configuration(_))));
    }
}
