//! Software model of a mistrained branch and its timing side effect.
//!
//! Used by tests and `--simulate` runs where the numbers must be
//! reproducible. [`VirtualClock`] stands in for the cycle counter and
//! [`SimulatedChannel`] advances it by a modelled latency on every
//! invocation, so the whole calibration pipeline runs unchanged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelPrimitive, ChannelTask};
use crate::measurement::CycleCounter;
use crate::types::TaskRole;

/// Counter that only moves when something advances it.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    ticks: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, cycles: u64) {
        self.ticks.fetch_add(cycles, Ordering::Relaxed);
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl CycleCounter for VirtualClock {
    fn fence(&self) {}

    fn read(&self) -> u64 {
        self.now()
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

/// Parameters of the simulated core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationModel {
    /// Latency of every invocation without signal.
    pub base_cycles: u64,
    /// Extra latency of a mispredicted probe with the bit set.
    pub signal_cycles: u64,
    /// Standard deviation of the Gaussian jitter added to every invocation.
    pub jitter: f64,
    /// Consecutive trained outcomes needed before a probe always mispredicts.
    pub required_depth: usize,
}

impl Default for SimulationModel {
    fn default() -> Self {
        Self {
            base_cycles: 100,
            signal_cycles: 40,
            jitter: 5.0,
            required_depth: 6,
        }
    }
}

impl SimulationModel {
    /// Model without jitter; every observation is exact.
    pub fn noiseless() -> Self {
        Self {
            jitter: 0.0,
            ..Self::default()
        }
    }

    /// Probability that a probe runs mispredicted after `confidence` trained
    /// outcomes.
    pub fn mispredict_probability(&self, confidence: usize) -> f64 {
        let required = self.required_depth.max(1);
        confidence.min(required) as f64 / required as f64
    }
}

/// Gate evaluated by the simulated branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedControl {
    /// Architectural outcome of the gate.
    pub taken: bool,
}

/// Channel backed by a saturating-confidence predictor.
///
/// Every trained outcome raises the confidence by one up to
/// `required_depth`; a probe mispredicts with probability
/// `confidence / required_depth` and resets it.
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    model: SimulationModel,
    clock: VirtualClock,
    rng: Xoshiro256PlusPlus,
    seed: u64,
    noise: Option<Normal<f64>>,
    confidence: usize,
    invocations: u64,
    mispredictions: u64,
}

impl SimulatedChannel {
    /// Create a channel advancing `clock`, with randomness drawn from `seed`.
    pub fn new(model: SimulationModel, clock: VirtualClock, seed: u64) -> Self {
        let noise = if model.jitter > 0.0 {
            Normal::new(0.0, model.jitter).ok()
        } else {
            None
        };

        Self {
            model,
            clock,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            seed,
            noise,
            confidence: 0,
            invocations: 0,
            mispredictions: 0,
        }
    }

    /// The model in use.
    pub fn model(&self) -> &SimulationModel {
        &self.model
    }

    /// Total invocations so far.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Probes that ran mispredicted so far.
    pub fn mispredictions(&self) -> u64 {
        self.mispredictions
    }

    fn jitter(&mut self) -> f64 {
        match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

impl ChannelPrimitive for SimulatedChannel {
    type Control = SimulatedControl;

    fn name(&self) -> &'static str {
        "simulated"
    }

    fn control(&self, role: TaskRole) -> SimulatedControl {
        SimulatedControl {
            taken: !role.is_probe(),
        }
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }

    fn invoke(&mut self, task: &ChannelTask<'_, SimulatedControl>, bit: u8) -> u64 {
        self.invocations += 1;

        let mut latency = self.model.base_cycles as f64 + self.jitter();

        if task.control.taken {
            self.confidence = (self.confidence + 1).min(self.model.required_depth);
        } else {
            let p = self.model.mispredict_probability(self.confidence);
            self.confidence = 0;
            if self.rng.random::<f64>() < p {
                self.mispredictions += 1;
                if task.secret_bit(bit) {
                    latency += self.model.signal_cycles as f64;
                }
            }
        }

        let cycles = latency.round().max(0.0) as u64;
        self.clock.advance(cycles);
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Sentinels;

    fn task<'s>(
        channel: &SimulatedChannel,
        role: TaskRole,
        sentinels: &'s Sentinels,
    ) -> ChannelTask<'s, SimulatedControl> {
        ChannelTask::new(role, channel.control(role), sentinels)
    }

    #[test]
    fn test_clock_advances() {
        let clock = VirtualClock::new();
        let shared = clock.clone();
        clock.advance(7);
        shared.advance(3);
        assert_eq!(clock.read(), 10);
        assert_eq!(shared.now(), 10);
    }

    #[test]
    fn test_mispredict_probability_saturates() {
        let model = SimulationModel::default();
        assert_eq!(model.mispredict_probability(0), 0.0);
        assert!((model.mispredict_probability(3) - 0.5).abs() < 1e-12);
        assert_eq!(model.mispredict_probability(6), 1.0);
        assert_eq!(model.mispredict_probability(60), 1.0);
    }

    #[test]
    fn test_fully_trained_probe_leaks() {
        let sentinels = Sentinels::new();
        let clock = VirtualClock::new();
        let mut channel = SimulatedChannel::new(SimulationModel::noiseless(), clock, 1);
        let model = *channel.model();

        let train = task(&channel, TaskRole::Train, &sentinels);
        let one = task(&channel, TaskRole::ProbeOne, &sentinels);
        let zero = task(&channel, TaskRole::ProbeZero, &sentinels);

        for _ in 0..model.required_depth {
            assert_eq!(channel.invoke(&train, 0), model.base_cycles);
        }
        assert_eq!(
            channel.invoke(&one, 0),
            model.base_cycles + model.signal_cycles
        );

        for _ in 0..model.required_depth {
            channel.invoke(&train, 0);
        }
        assert_eq!(channel.invoke(&zero, 0), model.base_cycles);
        assert_eq!(channel.mispredictions(), 2);
    }

    #[test]
    fn test_untrained_probe_is_silent() {
        let sentinels = Sentinels::new();
        let mut channel =
            SimulatedChannel::new(SimulationModel::noiseless(), VirtualClock::new(), 1);
        let one = task(&channel, TaskRole::ProbeOne, &sentinels);

        // Confidence resets after each probe, so back-to-back probes never leak
        for _ in 0..100 {
            assert_eq!(channel.invoke(&one, 5), channel.model().base_cycles);
        }
        assert_eq!(channel.mispredictions(), 0);
    }

    #[test]
    fn test_same_seed_same_latencies() {
        let sentinels = Sentinels::new();
        let mut a = SimulatedChannel::new(SimulationModel::default(), VirtualClock::new(), 77);
        let mut b = SimulatedChannel::new(SimulationModel::default(), VirtualClock::new(), 77);

        for i in 0..500 {
            let role = match i % 4 {
                1 => TaskRole::ProbeZero,
                3 => TaskRole::ProbeOne,
                _ => TaskRole::Train,
            };
            let ta = task(&a, role, &sentinels);
            let tb = task(&b, role, &sentinels);
            assert_eq!(a.invoke(&ta, 0), b.invoke(&tb, 0), "diverged at {}", i);
        }
    }
}
