//! Cache-residency channel.
//!
//! Each invocation chases `CHASE_HOPS` links through a large page-aligned
//! array whose link column encodes a seeded single-cycle permutation. The
//! resulting index gates a branch together with a per-task multiplier: the
//! multiplier is 1 for training tasks and 0 for probes, so probes never take
//! the branch architecturally. Under misprediction a set secret bit starts a
//! second chase through the (cache-resident) permutation table that touches
//! the rows the next invocation will walk, changing its cache residency.

use crate::constants::{CHASE_COLUMNS, CHASE_HOPS, CHASE_LINK_COLUMN, CHASE_ROWS};
use crate::measurement::black_box;
use crate::types::{Polarity, TaskRole};

use super::permutation::Permutation;
use super::{ChannelPrimitive, ChannelTask};

/// Multiplier gating the speculative chase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateControl {
    /// 1 for training tasks, 0 for probes.
    pub multiplier: i32,
}

/// One 4 KiB page of the chase array.
#[repr(C, align(4096))]
#[derive(Clone, Copy)]
struct Row([i32; CHASE_COLUMNS]);

/// Pointer-chase primitive.
pub struct PointerChaseChannel {
    linked: Vec<Row>,
    permutation: Permutation,
    seed: u64,
    start: usize,
    scratch: [u8; 16],
}

impl PointerChaseChannel {
    /// Build the chase array from the permutation generated by `seed`.
    pub fn new(seed: u64) -> Self {
        let permutation = Permutation::cyclic(CHASE_ROWS, seed);
        let mut linked = vec![Row([0; CHASE_COLUMNS]); CHASE_ROWS];

        // Follow the cycle from row 0 so every row links to its successor
        let mut next = permutation.successor(0);
        linked[0].0[CHASE_LINK_COLUMN] = next as i32;
        while next != 0 {
            let current = next;
            next = permutation.successor(current);
            linked[current].0[CHASE_LINK_COLUMN] = next as i32;
        }

        tracing::debug!(
            "Pointer-chase array ready: {} rows, seed {:#x}",
            CHASE_ROWS,
            seed
        );

        Self {
            linked,
            permutation,
            seed,
            start: 0,
            scratch: [0; 16],
        }
    }

    /// The permutation behind the chase array.
    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Row the next invocation starts from.
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline(always)]
    fn link(&self, row: usize) -> usize {
        // SAFETY: reference into a live row.
        let value = unsafe { std::ptr::read_volatile(&self.linked[row].0[CHASE_LINK_COLUMN]) };
        value as usize
    }
}

impl std::fmt::Debug for PointerChaseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerChaseChannel")
            .field("rows", &self.linked.len())
            .field("start", &self.start)
            .finish()
    }
}

impl ChannelPrimitive for PointerChaseChannel {
    type Control = GateControl;

    fn name(&self) -> &'static str {
        "pointer-chase"
    }

    fn control(&self, role: TaskRole) -> GateControl {
        match role {
            TaskRole::Train => GateControl { multiplier: 1 },
            TaskRole::ProbeZero | TaskRole::ProbeOne => GateControl { multiplier: 0 },
        }
    }

    fn polarity(&self) -> Polarity {
        Polarity::OneFaster
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }

    #[inline(never)]
    fn invoke(&mut self, task: &ChannelTask<'_, GateControl>, bit: u8) -> u64 {
        let multiplier = i64::from(black_box(task.control.multiplier));

        let mut next = self.start;
        for _ in 0..CHASE_HOPS {
            next = self.link(next);
        }

        if (next as i64).wrapping_mul(multiplier) != 0 && task.secret_bit(bit) {
            let mut next2 = self.start;
            for slot in 0..CHASE_HOPS {
                let value = self.link(next2) as u8;
                // SAFETY: in-bounds slot of an owned buffer.
                unsafe { std::ptr::write_volatile(&mut self.scratch[slot], value) };
                next2 = self.permutation.successor(next2);
            }
        }

        self.start = next;
        next as u64
    }
}
