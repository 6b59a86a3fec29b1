//! Common types shared by the trainer, sampler and calibrator.

use serde::{Deserialize, Serialize};

/// Role of a task inside a training sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskRole {
    /// Consistent outcome that trains the predictor; never measured.
    Train,
    /// Probe reading the all-zero sentinel.
    ProbeZero,
    /// Probe reading the all-ones sentinel.
    ProbeOne,
}

impl TaskRole {
    /// The sample class produced when a task with this role is timed.
    pub fn class(self) -> Class {
        match self {
            TaskRole::Train => Class::Train,
            TaskRole::ProbeZero => Class::Zero,
            TaskRole::ProbeOne => Class::One,
        }
    }

    /// Whether this role is one of the two probes.
    pub fn is_probe(self) -> bool {
        !matches!(self, TaskRole::Train)
    }
}

/// Class label attached to a timing sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    /// Training invocation (discarded by the calibrator).
    Train,
    /// Probe whose secret bit is 0.
    Zero,
    /// Probe whose secret bit is 1.
    One,
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::Train => write!(f, "train"),
            Class::Zero => write!(f, "0"),
            Class::One => write!(f, "1"),
        }
    }
}

/// Which probe class a primitive is expected to make slower.
///
/// The calibrator treats the faster class as "signal absent" and the slower
/// one as "signal present".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Bit = 1 observations take longer (division contention).
    #[default]
    OneSlower,
    /// Bit = 1 observations are shorter (lines prefetched by the chase).
    OneFaster,
}

/// A single timed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Class of the invoked task.
    pub class: Class,
    /// Measured duration in counter ticks.
    pub cycles: u64,
}

impl Sample {
    /// Create a new sample.
    pub fn new(class: Class, cycles: u64) -> Self {
        Self { class, cycles }
    }
}
