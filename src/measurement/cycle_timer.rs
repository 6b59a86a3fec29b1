//! Counter selection.
//!
//! This module provides:
//! - `BoxedCounter` - An enum wrapping all counter implementations
//! - `TimerKind` - Specification for which counter to use
//!
//! Counter implementations:
//! - `HardwareCounter` - Platform counter (rdtsc/cntvct_el0)
//! - `CounterThread` - Software counter incremented by a sibling thread

use serde::{Deserialize, Serialize};

use super::counter_thread::CounterThread;
use super::timer::{CycleCounter, HardwareCounter};

/// A counter that can be any of the supported implementations.
///
/// Enum dispatch keeps the sampler monomorphic in the hot loop.
#[derive(Debug)]
pub enum BoxedCounter {
    /// Platform hardware counter.
    Hardware(HardwareCounter),
    /// Software counter thread.
    Thread(CounterThread),
}

impl CycleCounter for BoxedCounter {
    #[inline]
    fn fence(&self) {
        match self {
            BoxedCounter::Hardware(c) => c.fence(),
            BoxedCounter::Thread(c) => c.fence(),
        }
    }

    #[inline]
    fn read(&self) -> u64 {
        match self {
            BoxedCounter::Hardware(c) => c.read(),
            BoxedCounter::Thread(c) => c.read(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BoxedCounter::Hardware(c) => c.name(),
            BoxedCounter::Thread(c) => c.name(),
        }
    }
}

/// Specification for which counter to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Counter thread on aarch64, hardware counter elsewhere.
    #[default]
    Auto,

    /// Always use the hardware counter.
    Hardware,

    /// Always use the software counter thread.
    ///
    /// Falls back to the hardware counter if the thread cannot be spawned.
    CounterThread,
}

impl TimerKind {
    /// Create a counter based on this specification.
    ///
    /// A counter thread that fails to start is logged and replaced by the
    /// hardware counter; timing fidelity drops but the run proceeds.
    pub fn create_counter(&self) -> BoxedCounter {
        let wants_thread = match self {
            TimerKind::Hardware => false,
            TimerKind::CounterThread => true,
            TimerKind::Auto => cfg!(target_arch = "aarch64"),
        };

        if wants_thread {
            match CounterThread::spawn() {
                Ok(thread) => return BoxedCounter::Thread(thread),
                Err(e) => {
                    tracing::warn!(
                        "Counter thread failed to start ({}). Falling back to the hardware counter.",
                        e
                    );
                }
            }
        }

        BoxedCounter::Hardware(HardwareCounter::new())
    }
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::Auto => write!(f, "auto"),
            TimerKind::Hardware => write!(f, "hardware"),
            TimerKind::CounterThread => write!(f, "counter-thread"),
        }
    }
}
