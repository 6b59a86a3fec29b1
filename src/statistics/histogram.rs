//! Per-cycle histogram of one class.

use serde::{Deserialize, Serialize};

/// Counts of observations per cycle value in `0..buckets`.
///
/// Values `>= buckets` are not binned; they only increment `overflow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
    overflow: u64,
}

impl Histogram {
    /// Create an empty histogram with `buckets` bins.
    pub fn new(buckets: usize) -> Self {
        Self {
            counts: vec![0; buckets],
            overflow: 0,
        }
    }

    /// Record one observation.
    #[inline]
    pub fn record(&mut self, cycles: u64) {
        match usize::try_from(cycles)
            .ok()
            .and_then(|i| self.counts.get_mut(i))
        {
            Some(bin) => *bin += 1,
            None => self.overflow += 1,
        }
    }

    /// Raw bin counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Observations too large to bin.
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Every recorded observation, binned or not.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.overflow
    }

    /// Bin counts divided by the total number of observations.
    pub fn normalized(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect()
    }
}
