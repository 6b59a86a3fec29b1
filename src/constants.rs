//! Channel and calibration constants.

/// Iterated divisions that size the speculative window of the division channel.
pub const N_DIVS: usize = 12;

/// Extra divisions per decoy issued on the speculative path.
pub const CONTENTION_DIVS: usize = 100;

/// Value of the four decoy dividends.
pub const DECOY_OPERAND: f64 = 123_456_778_910.0;

/// Divisor used by training tasks; the operand is `TRAIN_DIVISOR^N_DIVS`.
pub const TRAIN_DIVISOR: f64 = 3.0;

/// Operand used by probe tasks. With divisor 1 it never reaches 1.0.
pub const PROBE_OPERAND: f64 = 150.0;

/// Hops taken by each pointer chase.
pub const CHASE_HOPS: usize = 12;

/// Rows of the pointer-chase array.
pub const CHASE_ROWS: usize = 2048;

/// `i32` slots per row (one 4 KiB page).
pub const CHASE_COLUMNS: usize = 1024;

/// Column holding the successor index of each row.
pub const CHASE_LINK_COLUMN: usize = 256;

/// Histogram buckets per class.
pub const MAX_CYCLES: usize = 1024;

/// Default branch-predictor training depth (works on all tested cores).
pub const DEFAULT_DEPTH: usize = 9;

/// Default number of trials.
pub const DEFAULT_TRIALS: usize = 1_000_000;

/// Minimum busy-wait between invocations; the loop must run longer than this.
pub const MIN_SPACING: usize = 13;

/// Default busy-wait between invocations.
pub const DEFAULT_SPACING: usize = 16;

/// Default seed for the pointer-chase permutation and the simulation.
pub const DEFAULT_SEED: u64 = 0x5eed_2020;
