//! Branch-predictor training protocol.
//!
//! A trial is a fixed sequence of `2 * depth + 2` invocations:
//!
//! ```text
//! position:  0 .. depth-1   depth       depth+1 .. 2*depth   2*depth+1
//! role:      Train ...      ProbeZero   Train ...            ProbeOne
//! ```
//!
//! The `depth` consistent outcomes before each probe saturate the
//! predictor's history so the probe runs mispredicted.

use crate::channel::{ChannelPrimitive, ChannelTask, Sentinels};
use crate::measurement::{black_box, CycleCounter, Sampler};
use crate::types::{Sample, TaskRole};

/// Ordered tasks of one trial.
#[derive(Debug, Clone)]
pub struct TrainingSequence<'s, C> {
    tasks: Vec<ChannelTask<'s, C>>,
    depth: usize,
}

impl<'s, C: Copy> TrainingSequence<'s, C> {
    /// Build the sequence for `depth` using the primitive's controls.
    ///
    /// `depth` is clamped to at least 1.
    pub fn new<P>(primitive: &P, sentinels: &'s Sentinels, depth: usize) -> Self
    where
        P: ChannelPrimitive<Control = C>,
    {
        let depth = depth.max(1);
        let tasks = (0..2 * depth + 2)
            .map(|position| {
                let role = role_at(position, depth);
                ChannelTask::new(role, primitive.control(role), sentinels)
            })
            .collect();
        Self { tasks, depth }
    }

    /// Training depth of this sequence.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false; a sequence holds at least four tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in invocation order.
    pub fn tasks(&self) -> &[ChannelTask<'s, C>] {
        &self.tasks
    }

    /// Roles in invocation order.
    pub fn roles(&self) -> impl Iterator<Item = TaskRole> + '_ {
        self.tasks.iter().map(|t| t.role)
    }
}

/// Role of the task at `position` for a given depth.
pub fn role_at(position: usize, depth: usize) -> TaskRole {
    if position == depth {
        TaskRole::ProbeZero
    } else if position == 2 * depth + 1 {
        TaskRole::ProbeOne
    } else {
        TaskRole::Train
    }
}

/// Bit probed at `position`.
pub fn bit_index(position: usize) -> u8 {
    (position % 8) as u8
}

/// Drives one trial: every task once, in order, with a busy-wait before each.
///
/// The trainer only orders invocations and bounds their cadence; timing is
/// done by the [`Sampler`].
#[derive(Debug, Clone)]
pub struct BranchTrainer<'s, C> {
    sequence: TrainingSequence<'s, C>,
    spacing: usize,
}

impl<'s, C: Copy> BranchTrainer<'s, C> {
    /// Create a trainer for `sequence` waiting `spacing` iterations between calls.
    pub fn new(sequence: TrainingSequence<'s, C>, spacing: usize) -> Self {
        Self { sequence, spacing }
    }

    /// Run one trial, appending one sample per position to `out`.
    ///
    /// `out` is cleared first so the caller can reuse the allocation.
    #[inline]
    pub fn run_trial<P, T>(&self, primitive: &mut P, sampler: &Sampler<T>, out: &mut Vec<Sample>)
    where
        P: ChannelPrimitive<Control = C>,
        T: CycleCounter,
    {
        out.clear();
        for (position, task) in self.sequence.tasks.iter().enumerate() {
            spin(self.spacing);
            out.push(sampler.sample(primitive, task, bit_index(position)));
        }
    }
}

#[inline(always)]
fn spin(iterations: usize) {
    for i in 0..iterations {
        black_box(i);
    }
}
