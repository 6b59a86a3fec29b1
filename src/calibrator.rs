//! Main `Calibrator` entry point and builder.

use std::time::Instant;

use crate::channel::{ChannelPrimitive, Sentinels};
use crate::config::{Config, ConfigError};
use crate::measurement::{CycleCounter, Sampler};
use crate::result::{Calibration, CalibrationReport, HistogramDump, Metadata, Outcome};
use crate::statistics::{count_errors, select_threshold, ClassSummary, Histogram};
use crate::training::{BranchTrainer, TrainingSequence};
use crate::types::{Class, Polarity, Sample};

/// Runs the training protocol on a channel primitive and derives the
/// decoding threshold.
///
/// # Example
///
/// ```ignore
/// use rewind_calibrate::{Calibrator, DivisionChannel, HardwareCounter};
///
/// let report = Calibrator::new()
///     .depth(9)
///     .trials(100_000)
///     .run(&mut DivisionChannel::new(), HardwareCounter)?;
///
/// if let Some(calibration) = report.outcome.calibration() {
///     println!("threshold: {} cycles", calibration.threshold);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: Config,
    sentinels: Sentinels,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with a reduced trial count for tests and smoke runs.
    pub fn quick() -> Self {
        Self::with_config(Config::quick())
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            sentinels: Sentinels::new(),
        }
    }

    /// Set the branch training depth.
    pub fn depth(mut self, depth: usize) -> Self {
        self.config.depth = depth;
        self
    }

    /// Set the number of trials.
    pub fn trials(mut self, trials: usize) -> Self {
        self.config.trials = trials;
        self
    }

    /// Set the busy-wait between invocations.
    pub fn spacing(mut self, spacing: usize) -> Self {
        self.config.spacing = spacing;
        self
    }

    /// Set the histogram size.
    pub fn max_cycles(mut self, max_cycles: usize) -> Self {
        self.config.max_cycles = max_cycles;
        self
    }

    /// Enable or disable histogram diagnostics.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the calibration.
    ///
    /// Fails only when the configuration is invalid. An empty probe class
    /// yields [`Outcome::InsufficientData`].
    pub fn run<P, C>(&self, primitive: &mut P, counter: C) -> Result<CalibrationReport, ConfigError>
    where
        P: ChannelPrimitive,
        C: CycleCounter,
    {
        self.config.validate()?;

        let config = &self.config;
        let timer = counter.name();
        let sequence = TrainingSequence::new(&*primitive, &self.sentinels, config.depth);
        let trainer = BranchTrainer::new(sequence, config.spacing);
        let sampler = Sampler::new(counter);

        let mut zero: Vec<u64> = Vec::with_capacity(config.trials);
        let mut one: Vec<u64> = Vec::with_capacity(config.trials);
        let mut histograms = config.debug.then(|| ClassHistograms::new(config.max_cycles));
        let mut trial: Vec<Sample> = Vec::with_capacity(config.sequence_len());

        tracing::debug!(
            "Running {} trials of {} invocations on {} ({})",
            config.trials,
            config.sequence_len(),
            primitive.name(),
            timer
        );

        let start = Instant::now();
        for _ in 0..config.trials {
            trainer.run_trial(primitive, &sampler, &mut trial);
            for sample in &trial {
                match sample.class {
                    Class::Zero => zero.push(sample.cycles),
                    Class::One => one.push(sample.cycles),
                    Class::Train => {}
                }
                if let Some(h) = histograms.as_mut() {
                    h.record(sample);
                }
            }
        }
        let runtime_secs = start.elapsed().as_secs_f64();

        zero.sort_unstable();
        one.sort_unstable();

        let outcome = analyze(&zero, &one, primitive.polarity());
        match &outcome {
            Outcome::Calibrated(c) => tracing::debug!(
                "Threshold {} cycles ({}), error rate {:.4}",
                c.threshold,
                c.rule,
                c.error_rate
            ),
            Outcome::InsufficientData { .. } => {
                tracing::warn!("No probe samples collected; cannot derive a threshold")
            }
        }

        Ok(CalibrationReport {
            outcome,
            metadata: Metadata {
                channel: primitive.name().to_string(),
                timer: timer.to_string(),
                depth: config.depth,
                trials: config.trials,
                spacing: config.spacing,
                seed: primitive.seed(),
                runtime_secs,
            },
            histograms: histograms.map(ClassHistograms::dump),
        })
    }
}

/// Derive threshold and error rate from the two sorted probe distributions.
///
/// `polarity` decides which class is "absent" (expected faster).
pub fn analyze(zero_sorted: &[u64], one_sorted: &[u64], polarity: Polarity) -> Outcome {
    let (zero, one) = match (
        ClassSummary::from_sorted(zero_sorted),
        ClassSummary::from_sorted(one_sorted),
    ) {
        (Some(zero), Some(one)) => (zero, one),
        _ => {
            return Outcome::InsufficientData {
                zero_samples: zero_sorted.len(),
                one_samples: one_sorted.len(),
            }
        }
    };

    let ((absent, absent_sorted), (present, present_sorted)) = match polarity {
        Polarity::OneSlower => ((&zero, zero_sorted), (&one, one_sorted)),
        Polarity::OneFaster => ((&one, one_sorted), (&zero, zero_sorted)),
    };

    let (threshold, rule) = select_threshold(absent, present);
    let errors = count_errors(absent_sorted, present_sorted, threshold);

    Outcome::Calibrated(Calibration {
        threshold,
        rule,
        error_rate: errors.rate(),
        errors,
        polarity,
        zero,
        one,
    })
}

struct ClassHistograms {
    zero: Histogram,
    one: Histogram,
    train: Histogram,
}

impl ClassHistograms {
    fn new(buckets: usize) -> Self {
        Self {
            zero: Histogram::new(buckets),
            one: Histogram::new(buckets),
            train: Histogram::new(buckets),
        }
    }

    #[inline]
    fn record(&mut self, sample: &Sample) {
        match sample.class {
            Class::Zero => self.zero.record(sample.cycles),
            Class::One => self.one.record(sample.cycles),
            Class::Train => self.train.record(sample.cycles),
        }
    }

    fn dump(self) -> HistogramDump {
        HistogramDump {
            zero: self.zero.normalized(),
            one: self.one.normalized(),
            train: self.train.normalized(),
            overflow: [
                self.zero.overflow(),
                self.one.overflow(),
                self.train.overflow(),
            ],
        }
    }
}
