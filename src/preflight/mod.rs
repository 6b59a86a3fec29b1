//! Preflight checks run before calibration.
//!
//! None of these stop a run. They explain in advance why a calibration may
//! come out noisy or at chance level.
//!
//! # Checks Performed
//!
//! - **Resolution**: back-to-back counter reads advance, and not too coarsely
//! - **System**: governor, turbo, SMT, hypervisor, load (Linux)
//! - **Vulnerability**: kernel-reported Spectre v1/v2 status (Linux)

mod resolution;
mod system;
mod vulnerability;

pub use resolution::{assess_deltas, resolution_check, ResolutionWarning};
pub use system::{system_check, SystemWarning};
pub use vulnerability::{
    vulnerability_check, SpectreVariant, VulnerabilityStatus, VulnerabilityWarning,
};

use serde::{Deserialize, Serialize};

use crate::measurement::CycleCounter;

/// Result of running all preflight checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreflightResult {
    /// Warnings from the counter resolution check.
    pub resolution: Vec<ResolutionWarning>,

    /// Warnings from system checks.
    pub system: Vec<SystemWarning>,

    /// Kernel vulnerability status entries.
    pub vulnerability: Vec<VulnerabilityWarning>,
}

impl PreflightResult {
    /// Create a new empty preflight result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any critical warnings were found.
    pub fn has_critical(&self) -> bool {
        self.resolution.iter().any(ResolutionWarning::is_critical)
    }

    /// Total number of warnings.
    pub fn count(&self) -> usize {
        self.resolution.len() + self.system.len() + self.vulnerability.len()
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.count() > 0
    }

    /// Descriptions of every warning, critical first.
    pub fn descriptions(&self) -> Vec<(bool, String)> {
        let mut out: Vec<(bool, String)> = self
            .resolution
            .iter()
            .map(|w| (w.is_critical(), w.description()))
            .chain(self.system.iter().map(|w| (w.is_critical(), w.description())))
            .chain(
                self.vulnerability
                    .iter()
                    .map(|w| (w.is_critical(), w.description())),
            )
            .collect();
        out.sort_by_key(|(critical, _)| !critical);
        out
    }

    /// Emit every warning through `tracing`.
    pub fn log(&self) {
        for (critical, description) in self.descriptions() {
            if critical {
                tracing::error!("{}", description);
            } else {
                tracing::warn!("{}", description);
            }
        }
    }
}

/// Run all preflight checks against `counter`.
pub fn run_all_checks<C: CycleCounter>(counter: &C) -> PreflightResult {
    let result = PreflightResult {
        resolution: resolution_check(counter).into_iter().collect(),
        system: system_check(),
        vulnerability: vulnerability_check(),
    };
    tracing::debug!("Preflight finished with {} warnings", result.count());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::VirtualClock;

    #[test]
    fn test_empty_result() {
        let result = PreflightResult::new();
        assert!(!result.has_warnings());
        assert!(!result.has_critical());
    }

    #[test]
    fn test_critical_sorted_first() {
        let result = PreflightResult {
            resolution: vec![ResolutionWarning::CounterStalled {
                counter: "virtual".to_string(),
                reads: 1000,
            }],
            system: vec![SystemWarning::SmtActive],
            vulnerability: Vec::new(),
        };
        assert!(result.has_critical());
        assert_eq!(result.count(), 2);

        let descriptions = result.descriptions();
        assert!(descriptions[0].0);
        assert!(!descriptions[1].0);
    }

    #[test]
    fn test_run_all_checks_virtual_clock() {
        let result = run_all_checks(&VirtualClock::new());
        assert!(result.has_critical(), "A stalled clock must be flagged");
    }
}
