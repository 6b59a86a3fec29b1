//! Cycle counter resolution check.
//!
//! Back-to-back counter reads should differ by a handful of ticks. A counter
//! that never moves (a counter thread that is not scheduled) or that mostly
//! returns the same value (aarch64 `cntvct_el0` at ~24 MHz) cannot resolve
//! the few-cycle differences the channel produces.

use serde::{Deserialize, Serialize};

use crate::measurement::CycleCounter;

/// Warning from the resolution check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolutionWarning {
    /// The counter did not advance at all.
    ///
    /// This is a critical warning: every sample will read zero.
    CounterStalled {
        /// Counter name.
        counter: String,
        /// Back-to-back read pairs taken.
        reads: usize,
    },

    /// Most back-to-back reads returned the same value.
    CoarseResolution {
        /// Counter name.
        counter: String,
        /// Fraction of read pairs with zero difference.
        zero_fraction: f64,
        /// Smallest non-zero step observed.
        min_step: u64,
    },
}

impl ResolutionWarning {
    /// Check if this warning indicates a critical issue.
    pub fn is_critical(&self) -> bool {
        matches!(self, ResolutionWarning::CounterStalled { .. })
    }

    /// Get a human-readable description of the warning.
    pub fn description(&self) -> String {
        match self {
            ResolutionWarning::CounterStalled { counter, reads } => format!(
                "Counter '{}' did not advance over {} back-to-back reads. \
                 All durations will be zero.",
                counter, reads
            ),
            ResolutionWarning::CoarseResolution {
                counter,
                zero_fraction,
                min_step,
            } => format!(
                "Counter '{}' is coarse: {:.1}% of back-to-back reads were equal, \
                 smallest step {} ticks. Try --timer counter-thread.",
                counter,
                zero_fraction * 100.0,
                min_step
            ),
        }
    }
}

/// Read pairs taken by [`resolution_check`].
const READ_PAIRS: usize = 1000;

/// Fraction of equal reads above which the counter is considered coarse.
const COARSE_ZERO_FRACTION: f64 = 0.5;

/// Probe a counter with back-to-back reads.
pub fn resolution_check<C: CycleCounter>(counter: &C) -> Option<ResolutionWarning> {
    let deltas: Vec<u64> = (0..READ_PAIRS)
        .map(|_| {
            counter.fence();
            let a = counter.read();
            counter.fence();
            let b = counter.read();
            b.saturating_sub(a)
        })
        .collect();

    assess_deltas(counter.name(), &deltas)
}

/// Classify a set of back-to-back read differences.
pub fn assess_deltas(counter: &str, deltas: &[u64]) -> Option<ResolutionWarning> {
    if deltas.is_empty() {
        return None;
    }

    let min_step = deltas.iter().copied().filter(|&d| d > 0).min();
    let Some(min_step) = min_step else {
        return Some(ResolutionWarning::CounterStalled {
            counter: counter.to_string(),
            reads: deltas.len(),
        });
    };

    let zeros = deltas.iter().filter(|&&d| d == 0).count();
    let zero_fraction = zeros as f64 / deltas.len() as f64;
    if zero_fraction > COARSE_ZERO_FRACTION {
        return Some(ResolutionWarning::CoarseResolution {
            counter: counter.to_string(),
            zero_fraction,
            min_step,
        });
    }

    None
}
