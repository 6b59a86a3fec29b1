//! # rewind-calibrate
//!
//! Calibrate the decoding threshold of a speculative-execution covert
//! channel.
//!
//! A conditional branch is trained with `depth` consistent outcomes, then
//! probed with a task whose architectural path skips the gated body. During
//! the misprediction window the body runs anyway, and one bit of a secret
//! byte decides whether it leaves a timing footprint. Timing many probes of
//! both bit values yields two latency distributions; the calibrator picks the
//! cycle threshold that separates them and estimates the bit-error rate.
//!
//! Outputs:
//! - Threshold in cycles and the rule that produced it
//! - Balanced bit-error rate
//! - Per-class `(min, p1, median, p99, max)` and optional histograms
//! - Transfer rate of the probe loop
//!
//! ## Quick Start
//!
//! ```ignore
//! use rewind_calibrate::{Calibrator, DivisionChannel, HardwareCounter};
//!
//! let report = Calibrator::new()
//!     .depth(9)
//!     .run(&mut DivisionChannel::new(), HardwareCounter)?;
//!
//! match report.outcome.calibration() {
//!     Some(c) => println!("threshold {} cycles, error {:.2}%", c.threshold, c.error_rate * 100.0),
//!     None => println!("no probe samples"),
//! }
//! ```
//!
//! ## Deterministic runs
//!
//! [`simulation`] provides a channel and a clock that need no hardware,
//! so the whole pipeline can be exercised reproducibly.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod calibrator;
mod config;
mod constants;
mod result;
mod training;
mod types;

// Functional modules
pub mod channel;
pub mod measurement;
pub mod output;
pub mod preflight;
pub mod simulation;
pub mod statistics;

// Re-exports for public API
pub use calibrator::{analyze, Calibrator};
pub use channel::{
    ChannelKind, ChannelPrimitive, ChannelTask, DivisionChannel, PointerChaseChannel, Sentinels,
};
pub use config::{Config, ConfigError};
pub use constants::{
    CHASE_HOPS, CHASE_ROWS, DEFAULT_DEPTH, DEFAULT_SEED, DEFAULT_SPACING, DEFAULT_TRIALS,
    MAX_CYCLES, MIN_SPACING, N_DIVS,
};
pub use measurement::{CycleCounter, HardwareCounter, TimerKind};
pub use result::{Calibration, CalibrationReport, HistogramDump, Metadata, Outcome};
pub use statistics::{ClassSummary, ErrorCounts, ThresholdRule};
pub use training::{bit_index, role_at, BranchTrainer, TrainingSequence};
pub use types::{Class, Polarity, Sample, TaskRole};

/// Calibrate a hardware primitive selected at runtime.
///
/// Builds the primitive for `kind` (the pointer chase from `seed`; the
/// division channel ignores it) and runs it against `counter`.
pub fn calibrate<C: CycleCounter>(
    kind: ChannelKind,
    config: Config,
    seed: u64,
    counter: C,
) -> Result<CalibrationReport, ConfigError> {
    let calibrator = Calibrator::with_config(config);
    match kind {
        ChannelKind::Division => calibrator.run(&mut DivisionChannel::new(), counter),
        ChannelKind::PointerChase => calibrator.run(&mut PointerChaseChannel::new(seed), counter),
    }
}
