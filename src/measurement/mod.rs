//! Measurement infrastructure for the calibration loop.
//!
//! This module provides:
//! - Cycle counters behind the `CycleCounter` trait
//! - A software counter thread for cores without a usable hardware counter
//! - The `Sampler` that times one primitive invocation
//! - Best-effort process priority elevation
//!
//! # Counter Selection
//!
//! By default (`TimerKind::Auto`):
//! - **x86_64**: `mfence; rdtsc`
//! - **aarch64**: software counter thread, fenced with `dsb sy`
//! - **Other**: `std::time::Instant`, nanosecond resolution

mod counter_thread;
mod cycle_timer;
mod priority;
mod sampler;
mod timer;

pub use counter_thread::CounterThread;
pub use cycle_timer::{BoxedCounter, TimerKind};
pub use priority::{PriorityGuard, PriorityResult, TARGET_NICE};
pub use sampler::Sampler;
pub use timer::{black_box, read_cycle_counter, serialize, CycleCounter, HardwareCounter};
