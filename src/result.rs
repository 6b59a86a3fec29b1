//! Calibration result types.

use serde::{Deserialize, Serialize};

use crate::statistics::{ClassSummary, ErrorCounts, ThresholdRule};
use crate::types::Polarity;

/// Outcome of analysing the two probe distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A threshold was derived.
    Calibrated(Calibration),
    /// At least one class had no observations.
    InsufficientData {
        /// Observations of the bit = 0 class.
        zero_samples: usize,
        /// Observations of the bit = 1 class.
        one_samples: usize,
    },
}

impl Outcome {
    /// The calibration, if one was produced.
    pub fn calibration(&self) -> Option<&Calibration> {
        match self {
            Outcome::Calibrated(c) => Some(c),
            Outcome::InsufficientData { .. } => None,
        }
    }

    /// Threshold in cycles, if calibrated.
    pub fn threshold(&self) -> Option<u64> {
        self.calibration().map(|c| c.threshold)
    }

    /// Estimated bit-error rate, if calibrated.
    pub fn error_rate(&self) -> Option<f64> {
        self.calibration().map(|c| c.error_rate)
    }
}

/// The artifact consumed by the exploit: a threshold and its error rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Observations `<=` this many cycles decode as "signal absent".
    pub threshold: u64,

    /// Rule that produced the threshold.
    pub rule: ThresholdRule,

    /// Balanced bit-error rate `(fp + fn) / (2 * trials)`.
    ///
    /// Approximates the true bit-error rate when both bit values are equally
    /// likely.
    pub error_rate: f64,

    /// Misclassification counts behind `error_rate`.
    pub errors: ErrorCounts,

    /// Which class the primitive makes slower.
    pub polarity: Polarity,

    /// Order statistics of the bit = 0 probes.
    pub zero: ClassSummary,

    /// Order statistics of the bit = 1 probes.
    pub one: ClassSummary,
}

impl Calibration {
    /// Decode one observation into a bit.
    pub fn decode(&self, cycles: u64) -> u8 {
        let present = cycles > self.threshold;
        match (self.polarity, present) {
            (Polarity::OneSlower, true) | (Polarity::OneFaster, false) => 1,
            _ => 0,
        }
    }

    /// Whether the channel looks usable (error rate clearly below chance).
    pub fn is_usable(&self) -> bool {
        self.error_rate < 0.25
    }
}

/// Normalized per-cycle histograms of the three classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramDump {
    /// Share of bit = 0 probes per cycle value.
    pub zero: Vec<f64>,
    /// Share of bit = 1 probes per cycle value.
    pub one: Vec<f64>,
    /// Share of training invocations per cycle value.
    pub train: Vec<f64>,
    /// Observations beyond the last bucket, per class `[zero, one, train]`.
    pub overflow: [u64; 3],
}

/// Metadata about a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Channel primitive name.
    pub channel: String,
    /// Cycle counter name.
    pub timer: String,
    /// Branch training depth.
    pub depth: usize,
    /// Trials run.
    pub trials: usize,
    /// Busy-wait iterations between invocations.
    pub spacing: usize,
    /// Seed the primitive was built from; `None` for unseeded primitives.
    pub seed: Option<u64>,
    /// Wall-clock duration of the trial loop in seconds.
    pub runtime_secs: f64,
}

impl Metadata {
    /// Probe bits transferred per second (`2 * trials` over the loop runtime).
    pub fn bits_per_sec(&self) -> f64 {
        if self.runtime_secs <= 0.0 {
            return 0.0;
        }
        (2 * self.trials) as f64 / self.runtime_secs
    }

    /// Transfer rate in KB/s.
    pub fn kb_per_sec(&self) -> f64 {
        self.bits_per_sec() / 8.0 / 1000.0
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Threshold and error rate, or why none was derived.
    pub outcome: Outcome,
    /// Run metadata.
    pub metadata: Metadata,
    /// Histograms, when diagnostics were enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<HistogramDump>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{count_errors, ThresholdRule};

    fn calibration(polarity: Polarity) -> Calibration {
        let summary = ClassSummary::from_sorted(&[10]).unwrap();
        Calibration {
            threshold: 30,
            rule: ThresholdRule::CleanGap,
            error_rate: 0.0,
            errors: count_errors(&[10], &[50], 30),
            polarity,
            zero: summary,
            one: summary,
        }
    }

    #[test]
    fn test_decode_polarity() {
        let slow = calibration(Polarity::OneSlower);
        assert_eq!(slow.decode(10), 0);
        assert_eq!(slow.decode(30), 0);
        assert_eq!(slow.decode(31), 1);

        let fast = calibration(Polarity::OneFaster);
        assert_eq!(fast.decode(10), 1);
        assert_eq!(fast.decode(50), 0);
    }

    #[test]
    fn test_transfer_rate() {
        let metadata = Metadata {
            channel: "division".into(),
            timer: "rdtsc".into(),
            depth: 9,
            trials: 1_000_000,
            spacing: 16,
            seed: None,
            runtime_secs: 2.0,
        };
        assert!((metadata.bits_per_sec() - 1_000_000.0).abs() < 1e-6);
        assert!((metadata.kb_per_sec() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_runtime_rate() {
        let metadata = Metadata {
            channel: "simulated".into(),
            timer: "virtual".into(),
            depth: 1,
            trials: 0,
            spacing: 16,
            seed: None,
            runtime_secs: 0.0,
        };
        assert_eq!(metadata.bits_per_sec(), 0.0);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = Outcome::InsufficientData {
            zero_samples: 0,
            one_samples: 0,
        };
        assert!(outcome.threshold().is_none());

        let outcome = Outcome::Calibrated(calibration(Polarity::OneSlower));
        assert_eq!(outcome.threshold(), Some(30));
        assert_eq!(outcome.error_rate(), Some(0.0));
    }

    #[test]
    fn test_outcome_json_tag() {
        let outcome = Outcome::InsufficientData {
            zero_samples: 0,
            one_samples: 3,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"insufficient_data\""), "{}", json);
    }
}
