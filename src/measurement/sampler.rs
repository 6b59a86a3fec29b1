//! Timing of a single primitive invocation.

use crate::channel::{ChannelPrimitive, ChannelTask};
use crate::types::Sample;

use super::timer::{black_box, CycleCounter};

/// Times one `invoke` with a fence before each counter read.
///
/// Deliberately does nothing else, so its overhead is the same constant for
/// every class.
#[derive(Debug)]
pub struct Sampler<C> {
    counter: C,
}

impl<C: CycleCounter> Sampler<C> {
    /// Create a sampler reading the given counter.
    pub fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Measure one invocation of `primitive` on `task`.
    #[inline]
    pub fn sample<P: ChannelPrimitive>(
        &self,
        primitive: &mut P,
        task: &ChannelTask<'_, P::Control>,
        bit: u8,
    ) -> Sample {
        self.counter.fence();
        let start = self.counter.read();
        black_box(primitive.invoke(task, bit));
        self.counter.fence();
        let end = self.counter.read();

        Sample::new(task.role.class(), end.saturating_sub(start))
    }
}
