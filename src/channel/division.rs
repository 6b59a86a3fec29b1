//! Floating-point division channel.
//!
//! The receiver divides an operand `N_DIVS` times. Training tasks use an
//! operand that converges to exactly 1.0, so the predictor learns that the
//! `recv == 1.0` gate is taken. Probes use an operand that never converges:
//! architecturally the gated body is dead, but during the misprediction
//! window it runs, and when the secret bit is set it floods the divider with
//! decoy divisions. The contention outlives the squash and shows up in the
//! measured latency.

use crate::constants::{
    CONTENTION_DIVS, DECOY_OPERAND, N_DIVS, PROBE_OPERAND, TRAIN_DIVISOR,
};
use crate::measurement::black_box;
use crate::types::TaskRole;

use super::{ChannelPrimitive, ChannelTask};

/// Operand and divisor of a division task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivisionControl {
    /// Starting value of the receiver.
    pub operand: f64,
    /// Divisor applied `N_DIVS` times.
    pub divisor: f64,
}

impl DivisionControl {
    /// Control that converges to 1.0 (`3^N_DIVS / 3 ... / 3`).
    pub fn trained() -> Self {
        Self {
            operand: TRAIN_DIVISOR.powi(N_DIVS as i32),
            divisor: TRAIN_DIVISOR,
        }
    }

    /// Control that stays at `PROBE_OPERAND`.
    pub fn probe() -> Self {
        Self {
            operand: PROBE_OPERAND,
            divisor: 1.0,
        }
    }

    /// Whether the receiver reaches exactly 1.0 after `N_DIVS` divisions.
    #[allow(clippy::float_cmp)]
    pub fn converges(&self) -> bool {
        let mut recv = self.operand;
        for _ in 0..N_DIVS {
            recv /= self.divisor;
        }
        recv == 1.0
    }
}

/// Divider-contention primitive.
#[derive(Debug, Clone)]
pub struct DivisionChannel {
    decoys: [f64; 4],
}

impl DivisionChannel {
    /// Create the primitive with its decoy operands.
    pub fn new() -> Self {
        Self {
            decoys: [DECOY_OPERAND; 4],
        }
    }
}

impl Default for DivisionChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPrimitive for DivisionChannel {
    type Control = DivisionControl;

    fn name(&self) -> &'static str {
        "division"
    }

    fn control(&self, role: TaskRole) -> DivisionControl {
        match role {
            TaskRole::Train => DivisionControl::trained(),
            TaskRole::ProbeZero | TaskRole::ProbeOne => DivisionControl::probe(),
        }
    }

    #[inline]
    fn invoke(&mut self, task: &ChannelTask<'_, DivisionControl>, bit: u8) -> u64 {
        transmit(task, bit, self.decoys).to_bits()
    }
}

#[inline(never)]
#[allow(clippy::float_cmp)]
fn transmit(task: &ChannelTask<'_, DivisionControl>, bit: u8, decoys: [f64; 4]) -> f64 {
    let mut recv = black_box(task.control.operand);
    let div = black_box(task.control.divisor);
    let [mut send1, mut send2, mut send3, mut send4] = black_box(decoys);

    // window size
    for _ in 0..N_DIVS {
        recv /= div;
    }

    // trained taken; not taken for probes
    if recv == 1.0 {
        // trained not taken; taken for a set bit
        if task.secret_bit(bit) {
            for _ in 0..CONTENTION_DIVS {
                send1 /= div;
                send2 /= div;
                send3 /= div;
                send4 /= div;
            }
        }
    }

    recv + send1 + send2 + send3 + send4
}
