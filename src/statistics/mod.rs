//! Statistics over per-class timing distributions.
//!
//! - Order statistics at fixed indices of a sorted distribution
//! - Threshold selection between the absent and present classes
//! - Error counting against a threshold
//! - Fixed-width cycle histograms

mod histogram;
mod order;
mod threshold;

pub use histogram::Histogram;
pub use order::{percentile_index, ClassSummary};
pub use threshold::{count_errors, select_threshold, ErrorCounts, ThresholdRule};
