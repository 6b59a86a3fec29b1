//! Order statistics of a sorted distribution.
//!
//! Percentiles are read at plain integer indices (`n * pct / 100`) with no
//! interpolation, so the threshold rule sees values that were actually
//! observed.

use serde::{Deserialize, Serialize};

/// Index of percentile `pct` in a sorted slice of length `n`.
///
/// `pct = 100` maps to the last element.
#[inline]
pub fn percentile_index(n: usize, pct: usize) -> usize {
    if n == 0 {
        return 0;
    }
    (n * pct / 100).min(n - 1)
}

/// `(min, p1, median, p99, max)` of one probe class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    /// Smallest observation.
    pub min: u64,
    /// Value at index `n / 100`.
    pub p1: u64,
    /// Value at index `n / 2`.
    pub median: u64,
    /// Value at index `n * 99 / 100`.
    pub p99: u64,
    /// Largest observation.
    pub max: u64,
    /// Number of observations.
    pub samples: usize,
}

impl ClassSummary {
    /// Summarize an ascending slice. Returns `None` when it is empty.
    pub fn from_sorted(sorted: &[u64]) -> Option<Self> {
        debug_assert!(
            sorted.windows(2).all(|w| w[0] <= w[1]),
            "distribution must be sorted"
        );

        let n = sorted.len();
        let first = *sorted.first()?;
        let last = *sorted.last()?;

        Some(Self {
            min: first,
            p1: sorted[n / 100],
            median: sorted[n / 2],
            p99: sorted[percentile_index(n, 99)],
            max: last,
            samples: n,
        })
    }

    /// The five order statistics as a tuple, lowest first.
    pub fn as_tuple(&self) -> (u64, u64, u64, u64, u64) {
        (self.min, self.p1, self.median, self.p99, self.max)
    }
}
