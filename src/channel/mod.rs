//! Covert-channel primitives.
//!
//! A primitive turns one secret bit into a latency difference, but only while
//! it runs inside a misprediction window. On the architectural path both
//! classes execute the same instructions and produce no side effect.
//!
//! Two hardware strategies are provided:
//! - [`DivisionChannel`]: floating-point divider contention
//! - [`PointerChaseChannel`]: cache residency of pointer-chase rows
//!
//! The [`crate::simulation`] module adds a software model with the same
//! interface for deterministic runs.

mod division;
mod permutation;
mod pointer_chase;

pub use division::{DivisionChannel, DivisionControl};
pub use permutation::Permutation;
pub use pointer_chase::{GateControl, PointerChaseChannel};

use serde::{Deserialize, Serialize};

use crate::types::{Polarity, TaskRole};

/// Strategy interface shared by all primitives.
pub trait ChannelPrimitive {
    /// Latency-control parameter carried by each task.
    type Control: Copy + std::fmt::Debug;

    /// Primitive name for diagnostics and metadata.
    fn name(&self) -> &'static str;

    /// Control parameter for a task with the given role.
    fn control(&self, role: TaskRole) -> Self::Control;

    /// Which class this primitive makes slower.
    fn polarity(&self) -> Polarity {
        Polarity::OneSlower
    }

    /// Seed the primitive was built from, if it uses one.
    fn seed(&self) -> Option<u64> {
        None
    }

    /// Run the primitive once on `task`, probing bit `bit` of its secret.
    ///
    /// The returned witness carries no meaning; it only keeps the body alive.
    fn invoke(&mut self, task: &ChannelTask<'_, Self::Control>, bit: u8) -> u64;
}

/// The bytes read through the channel.
///
/// Written once when the calibrator is built and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinels {
    zero: u8,
    ones: u8,
}

impl Sentinels {
    /// `zero = 0x00`, `ones = 0xFF`.
    pub fn new() -> Self {
        Self {
            zero: 0x00,
            ones: 0xFF,
        }
    }

    /// The sentinel a task with `role` reads.
    pub fn for_role(&self, role: TaskRole) -> &u8 {
        match role {
            TaskRole::Train | TaskRole::ProbeZero => &self.zero,
            TaskRole::ProbeOne => &self.ones,
        }
    }
}

impl Default for Sentinels {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of a training sequence.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTask<'s, C> {
    /// Role of the task in the sequence.
    pub role: TaskRole,
    /// Primitive-specific latency control.
    pub control: C,
    /// Byte whose bits are probed.
    pub secret: &'s u8,
}

impl<'s, C> ChannelTask<'s, C> {
    /// Create a task reading the sentinel that matches `role`.
    pub fn new(role: TaskRole, control: C, sentinels: &'s Sentinels) -> Self {
        Self {
            role,
            control,
            secret: sentinels.for_role(role),
        }
    }

    /// Load the secret byte and test bit `bit` (taken modulo 8).
    #[inline(always)]
    pub fn secret_bit(&self, bit: u8) -> bool {
        // SAFETY: `secret` is a live shared reference.
        let byte = unsafe { std::ptr::read_volatile(self.secret) };
        byte & (1u8 << (bit & 7)) != 0
    }
}

/// Runtime selection of a hardware primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Floating-point division contention.
    #[default]
    Division,
    /// Pointer chase through a page-aligned array.
    PointerChase,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Division => write!(f, "division"),
            ChannelKind::PointerChase => write!(f, "pointer-chase"),
        }
    }
}
